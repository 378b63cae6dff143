//! Per-video deep-dive prompt for the top items by views.

use mintel_core::{ContentItem, Platform, MAX_VIDEO_ANALYSES};
use serde_json::json;

use super::context::{opener, transcripts_block, truncate_block, MAX_COMPETITORS_CHARS};

const SCHEMA: &str = r#"
Devuelve EXCLUSIVAMENTE un ARRAY JSON válido, sin markdown y sin texto fuera del JSON, con un
objeto por video, en el mismo orden en que aparecen arriba:

[
  {
    "creator": string,
    "video_url": string,
    "title": string,
    "views": number,
    "duration": string,
    "hook_type": string,
    "hook_text": string,
    "content_structure": string,
    "replicable_elements": string,
    "funnel_role": string,
    "distribution_analysis": string,
    "retention_tactics": string,
    "video_analysis": string
  }
]

Reglas obligatorias:
- Las 13 claves deben existir en cada objeto.
- "creator", "video_url", "title", "views" y "duration" se copian de los datos de entrada.
- Cada campo de texto tiene un máximo de 600 caracteres.
- "replicable_elements" y "retention_tactics" contienen como máximo 6 elementos, numerados
  dentro del mismo string ("1. ... 2. ...").
- "video_analysis" es un análisis en viñetas, 100% en español, con este formato exacto:
  "• Gancho: ...\n• Desarrollo: ...\n• Cierre: ...\n• Por qué funciona: ..."
- Si falta la transcripción, analiza solo lo observable (título, métricas, duración) y
  dilo explícitamente en "video_analysis".
- Todo el contenido textual debe estar en español; las claves permanecen en inglés.
"#;

/// Builds the deep-dive prompt, or `None` when there is nothing to analyse.
///
/// Only the first [`MAX_VIDEO_ANALYSES`] items are used; callers pass them
/// already ordered by views.
#[must_use]
pub fn build_video_prompt(platform: Platform, items: &[ContentItem]) -> Option<String> {
    let items = &items[..items.len().min(MAX_VIDEO_ANALYSES)];
    if items.is_empty() {
        return None;
    }

    let listing: Vec<_> = items
        .iter()
        .map(|item| {
            json!({
                "creator": item.creator,
                "video_url": item.video_url,
                "title": item.title,
                "views": item.views,
                "duration": item.duration.clone().unwrap_or_default(),
                "published_at": item.published_at,
            })
        })
        .collect();
    let listing = serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "[]".to_owned());

    let mut prompt = opener(platform);
    prompt.push_str("Videos con más visualizaciones:\n");
    prompt.push_str(&truncate_block(&listing, MAX_COMPETITORS_CHARS));
    prompt.push('\n');
    if let Some(transcripts) = transcripts_block(items) {
        prompt.push_str("Transcripciones:\n");
        prompt.push_str(&transcripts);
        prompt.push('\n');
    }
    prompt.push_str(
        "\nAnaliza en profundidad cada video: tipo y texto del gancho, estructura del contenido, \
         elementos replicables, rol en el embudo, distribución y tácticas de retención.\n",
    );
    prompt.push_str(SCHEMA);
    Some(prompt)
}

//! General-strategy prompt.
//!
//! Works from a slimmed competitor view (no transcripts, no raw payloads) so
//! the prompt stays small regardless of how much was collected.

use super::context::{
    opener, slim_competitors_block, timeframe_line, ResearchContext, ANALYST_PREAMBLE,
    NO_SIGNAL_NOTICE, OBJECT_RULES,
};

const SCHEMA: &str = r#"
Devuelve EXCLUSIVAMENTE un JSON válido, sin markdown, sin comentarios y sin texto fuera del JSON.

La estructura debe ser EXACTAMENTE:

{
  "hook_frameworks": [
    { "framework": string, "description": string }
  ],
  "positioning_analysis": string,
  "market_sophistication_level": string,
  "recommended_content_angles": [
    { "angle": string, "description": string }
  ],
  "storytelling_structures": [
    { "structure": string, "description": string }
  ]
}
"#;

#[must_use]
pub fn build_strategy_prompt(ctx: &ResearchContext<'_>) -> String {
    let mut prompt = opener(ctx.platform);
    prompt.push_str(&timeframe_line(ctx.timeframe));
    if ctx.lacks_signal() {
        prompt.push_str(NO_SIGNAL_NOTICE);
    }
    prompt.push_str("Competidores (resumen):\n");
    prompt.push_str(&slim_competitors_block(ctx.competitors));
    prompt.push('\n');

    prompt.push_str(ANALYST_PREAMBLE);
    prompt.push_str(
        "\nTu tarea es construir la estrategia de contenido: frameworks de ganchos usados por los \
         competidores, su posicionamiento implícito, el nivel de sofisticación del mensaje en el \
         mercado, ángulos de contenido recomendados y estructuras de storytelling replicables.\n",
    );
    prompt.push_str(SCHEMA);
    prompt.push('\n');
    prompt.push_str(OBJECT_RULES);
    prompt
}

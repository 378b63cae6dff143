//! Data blocks shared by the prompt builders.

use mintel_core::{ContentItem, EnrichedCompetitor, Platform, TimeframeDays};
use serde::Serialize;
use serde_json::Value;

/// Character budget for the serialized competitor block.
pub const MAX_COMPETITORS_CHARS: usize = 8_000;
/// Character budget for the serialized transcript block.
pub const MAX_TRANSCRIPTS_CHARS: usize = 12_000;
/// Titles per competitor in the slimmed strategy view.
pub const SLIM_TOP_TITLES: usize = 5;

pub(crate) const TRUNCATED_MARKER: &str = "\n[TRUNCATED]";

pub(crate) const NO_SIGNAL_NOTICE: &str = "AVISO: No fue posible obtener datos públicos de ninguno \
de los competidores (perfiles privados, bloqueados o sin contenido reciente). No inventes \
métricas, patrones ni ejemplos. Devuelve todas las claves con strings vacíos o breves \
indicando la falta de datos, y arrays vacíos [].\n";

/// Everything a builder needs about one job.
#[derive(Debug, Clone, Copy)]
pub struct ResearchContext<'a> {
    pub platform: Platform,
    pub timeframe: TimeframeDays,
    pub competitors: &'a [EnrichedCompetitor],
}

impl ResearchContext<'_> {
    /// True when no competitor produced any usable data.
    #[must_use]
    pub fn lacks_signal(&self) -> bool {
        !self.competitors.iter().any(EnrichedCompetitor::has_signal)
    }
}

pub(crate) fn opener(platform: Platform) -> String {
    format!(
        "Eres un analista de inteligencia competitiva especializado en {}. Analiza los siguientes datos:\n",
        platform.display_name()
    )
}

pub(crate) fn timeframe_line(timeframe: TimeframeDays) -> String {
    format!("Periodo analizado: últimos {} días.\n", timeframe.days())
}

/// Cuts `text` to `max_chars` characters and appends the truncation marker.
pub(crate) fn truncate_block(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{TRUNCATED_MARKER}", &text[..idx]),
        None => text.to_owned(),
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_owned())
}

/// Competitor snapshots without transcripts, truncated to
/// [`MAX_COMPETITORS_CHARS`].
pub(crate) fn competitors_block(competitors: &[EnrichedCompetitor]) -> String {
    let stripped: Vec<EnrichedCompetitor> = competitors
        .iter()
        .map(|c| {
            let mut c = c.clone();
            for item in &mut c.videos {
                item.transcript = None;
            }
            c
        })
        .collect();
    truncate_block(&pretty(&stripped), MAX_COMPETITORS_CHARS)
}

#[derive(Serialize)]
struct SlimCompetitor<'a> {
    name: &'a str,
    handle: Option<&'a str>,
    bio: &'a str,
    followers: u64,
    avg_views: u64,
    top_titles: Vec<&'a str>,
}

/// Name, bio, follower count, average views and the top titles by views.
pub(crate) fn slim_competitors_block(competitors: &[EnrichedCompetitor]) -> String {
    let slim: Vec<SlimCompetitor<'_>> = competitors
        .iter()
        .map(|c| {
            let mut items: Vec<&ContentItem> = c.videos.iter().collect();
            items.sort_by(|a, b| b.views.cmp(&a.views));
            SlimCompetitor {
                name: &c.name,
                handle: c.handle.as_deref(),
                bio: &c.bio,
                followers: c.followers,
                avg_views: c.avg_views,
                top_titles: items
                    .into_iter()
                    .filter(|i| !i.title.is_empty())
                    .take(SLIM_TOP_TITLES)
                    .map(|i| i.title.as_str())
                    .collect(),
            }
        })
        .collect();
    truncate_block(&pretty(&slim), MAX_COMPETITORS_CHARS)
}

/// Transcripts keyed by video, or `None` when there are none.
pub(crate) fn transcripts_block(items: &[ContentItem]) -> Option<String> {
    let entries: Vec<Value> = items
        .iter()
        .filter_map(|item| {
            let transcript = item.transcript.as_deref().filter(|t| !t.is_empty())?;
            Some(serde_json::json!({
                "video_id": item.video_id,
                "title": item.title,
                "transcript": transcript,
            }))
        })
        .collect();
    if entries.is_empty() {
        return None;
    }
    Some(truncate_block(&pretty(&entries), MAX_TRANSCRIPTS_CHARS))
}

/// Shared output rules appended to every object-shaped prompt.
pub(crate) const OBJECT_RULES: &str = "\
Reglas obligatorias:
- Todas las claves deben existir.
- Si no hay evidencia suficiente, devuelve arrays vacíos [].
- No incluyas texto fuera del JSON.
- No uses markdown.
- No agregues claves adicionales.
- Máximo 5 elementos por array.
- Cada descripción debe ser concreta, estratégica y no genérica.
- Todo el contenido textual debe estar 100% en español.
- Las claves del JSON deben permanecer en inglés exactamente como están.
";

pub(crate) const ANALYST_PREAMBLE: &str = "
Eres un analista senior de inteligencia competitiva y estrategia digital. Tu nivel es experto. \
No generas análisis genéricos. No produces consejos superficiales. Detectas patrones reales a \
partir de los datos proporcionados.

IMPORTANTE:
- No escribas frases aplicables a cualquier cuenta.
- Basa cada insight en patrones observables del contenido analizado.
- Si no puedes inferir algo desde los datos, deja el array vacío [].
- No inventes información.
";

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, title: &str, views: u64, transcript: Option<&str>) -> ContentItem {
        ContentItem {
            video_id: id.to_owned(),
            title: title.to_owned(),
            views,
            transcript: transcript.map(str::to_owned),
            ..ContentItem::default()
        }
    }

    #[test]
    fn truncate_block_marks_cut() {
        assert_eq!(truncate_block("abc", 3), "abc");
        assert_eq!(truncate_block("abcdef", 3), "abc\n[TRUNCATED]");
        assert_eq!(truncate_block("ñññ", 2), "ññ\n[TRUNCATED]");
    }

    #[test]
    fn competitors_block_drops_transcripts_and_truncates() {
        let mut c = EnrichedCompetitor::empty(Platform::Youtube, "https://youtube.com/@a");
        c.videos = vec![item("v1", "t", 1, Some("secreto"))];
        let block = competitors_block(std::slice::from_ref(&c));
        assert!(!block.contains("secreto"));

        c.bio = "x".repeat(MAX_COMPETITORS_CHARS * 2);
        let block = competitors_block(&[c]);
        assert!(block.ends_with("[TRUNCATED]"));
        assert_eq!(
            block.chars().count(),
            MAX_COMPETITORS_CHARS + TRUNCATED_MARKER.chars().count()
        );
    }

    #[test]
    fn slim_block_keeps_top_titles_only() {
        let mut c = EnrichedCompetitor::empty(Platform::Youtube, "https://youtube.com/@a");
        c.name = "Canal".to_owned();
        c.videos = (0..8u64)
            .map(|i| item(&format!("v{i}"), &format!("titulo {i}"), i * 10, Some("largo")))
            .collect();
        let block = slim_competitors_block(&[c]);
        let parsed: Value = serde_json::from_str(&block).unwrap();
        let titles = parsed[0]["top_titles"].as_array().unwrap();
        assert_eq!(titles.len(), SLIM_TOP_TITLES);
        assert_eq!(titles[0], "titulo 7");
        assert!(!block.contains("largo"));
        assert!(!block.contains("video_url"));
    }

    #[test]
    fn transcripts_block_skips_empty() {
        let items = [item("a", "t", 1, None), item("b", "t", 1, Some(""))];
        assert!(transcripts_block(&items).is_none());
        let block = transcripts_block(&[item("a", "t", 1, Some("hola"))]).unwrap();
        assert!(block.contains("hola"));
    }

    #[test]
    fn lacks_signal_when_everything_is_empty() {
        let empty = [EnrichedCompetitor::empty(Platform::Instagram, "https://instagram.com/a")];
        let ctx = ResearchContext {
            platform: Platform::Instagram,
            timeframe: TimeframeDays::Thirty,
            competitors: &empty,
        };
        assert!(ctx.lacks_signal());
    }
}

//! Market-overview prompt: executive summary, dominant patterns, saturation,
//! gaps and opportunities.

use mintel_core::top_items_by_views;

use super::context::{
    competitors_block, opener, timeframe_line, transcripts_block, ResearchContext,
    ANALYST_PREAMBLE, NO_SIGNAL_NOTICE, OBJECT_RULES,
};
use crate::prompts::TRANSCRIPT_ITEMS;

const SCHEMA: &str = r#"
Devuelve EXCLUSIVAMENTE un JSON válido, sin markdown, sin comentarios y sin texto fuera del JSON.

La estructura debe ser EXACTAMENTE:

{
  "executive_summary": string,
  "dominant_patterns": [
    { "pattern": string, "description": string }
  ],
  "saturation_level": string,
  "market_gaps": [
    { "gap": string, "description": string }
  ],
  "strategic_opportunities": [
    { "opportunity": string, "description": string }
  ]
}
"#;

#[must_use]
pub fn build_overview_prompt(ctx: &ResearchContext<'_>) -> String {
    let mut prompt = opener(ctx.platform);
    prompt.push_str(&timeframe_line(ctx.timeframe));
    if ctx.lacks_signal() {
        prompt.push_str(NO_SIGNAL_NOTICE);
    }
    prompt.push_str("Competidores:\n");
    prompt.push_str(&competitors_block(ctx.competitors));
    prompt.push('\n');

    let top = top_items_by_views(ctx.competitors, TRANSCRIPT_ITEMS);
    if let Some(transcripts) = transcripts_block(&top) {
        prompt.push_str("Transcripciones:\n");
        prompt.push_str(&transcripts);
        prompt.push('\n');
    }

    prompt.push_str(ANALYST_PREAMBLE);
    prompt.push_str(
        "\nTu tarea es construir una visión general del mercado basada EXCLUSIVAMENTE en los \
         datos entregados arriba: resume la situación competitiva, detecta patrones dominantes, \
         evalúa el nivel de saturación e identifica brechas y oportunidades diferenciales reales.\n",
    );
    prompt.push_str(SCHEMA);
    prompt.push('\n');
    prompt.push_str(OBJECT_RULES);
    prompt
}

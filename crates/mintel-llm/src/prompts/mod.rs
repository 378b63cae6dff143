//! Prompt builders. All pure: no I/O, deterministic for a given input.

mod context;
mod overview;
mod strategy;
mod video;

pub use context::{
    ResearchContext, MAX_COMPETITORS_CHARS, MAX_TRANSCRIPTS_CHARS, SLIM_TOP_TITLES,
};
pub use overview::build_overview_prompt;
pub use strategy::build_strategy_prompt;
pub use video::build_video_prompt;

/// Items whose transcripts are included in the overview.
pub(crate) const TRANSCRIPT_ITEMS: usize = mintel_core::MAX_VIDEO_ANALYSES;

/// Appended when a previous completion was cut off.
pub const TRUNCATION_RETRY_NOTICE: &str = "\n\nIMPORTANTE: Tu respuesta anterior quedó \
truncada y no era un JSON completo. Vuelve a enviar la respuesta COMPLETA desde el inicio, \
más concisa, asegurándote de cerrar todas las llaves y corchetes. Devuelve solo el JSON.";

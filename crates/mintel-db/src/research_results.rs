//! Database operations for `research_results`.
//!
//! Columns keep the Spanish names the dashboard reads.

use chrono::{DateTime, Utc};
use mintel_core::{insights_to_value, MarketOverview, ResearchReport, StrategyReport};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{research_requests, DbError};

/// A row from the `research_results` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ResearchResultRow {
    pub id: i64,
    pub request_id: Uuid,
    pub resumen_ejecutivo: String,
    pub patrones_dominantes: serde_json::Value,
    pub frameworks_de_ganchos: serde_json::Value,
    pub analisis_de_posicionamiento: String,
    pub nivel_de_sofisticacion_del_mercado: String,
    pub nivel_de_saturacion: String,
    pub brechas_de_mercado: serde_json::Value,
    pub oportunidades_estrategicas: serde_json::Value,
    pub angulos_de_contenido_recomendados: serde_json::Value,
    pub estructuras_de_storytelling: serde_json::Value,
    pub analisis_por_video: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ResearchResultRow {
    /// Encodes a validated report into column values.
    ///
    /// `id` and `created_at` are placeholders until the row is stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if the per-video section cannot be encoded.
    pub fn from_report(request_id: Uuid, report: &ResearchReport) -> Result<Self, DbError> {
        let overview = &report.overview;
        let strategy = &report.strategy;
        let analisis_por_video = report
            .videos
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        Ok(Self {
            id: 0,
            request_id,
            resumen_ejecutivo: overview.executive_summary.clone(),
            patrones_dominantes: insights_to_value(
                &overview.dominant_patterns,
                MarketOverview::PATTERN_KEY,
            ),
            frameworks_de_ganchos: insights_to_value(
                &strategy.hook_frameworks,
                StrategyReport::FRAMEWORK_KEY,
            ),
            analisis_de_posicionamiento: strategy.positioning_analysis.clone(),
            nivel_de_sofisticacion_del_mercado: strategy.market_sophistication_level.clone(),
            nivel_de_saturacion: overview.saturation_level.clone(),
            brechas_de_mercado: insights_to_value(&overview.market_gaps, MarketOverview::GAP_KEY),
            oportunidades_estrategicas: insights_to_value(
                &overview.strategic_opportunities,
                MarketOverview::OPPORTUNITY_KEY,
            ),
            angulos_de_contenido_recomendados: insights_to_value(
                &strategy.recommended_content_angles,
                StrategyReport::ANGLE_KEY,
            ),
            estructuras_de_storytelling: insights_to_value(
                &strategy.storytelling_structures,
                StrategyReport::STRUCTURE_KEY,
            ),
            analisis_por_video,
            created_at: Utc::now(),
        })
    }
}

/// Replaces the result for `request_id`: deletes any existing row, then
/// inserts the new one, inside one transaction.
///
/// Re-running a job therefore never merges fields from an earlier attempt.
/// The request row is locked and must still be `processing`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the request is not
/// `processing`, or [`DbError::Sqlx`] if a statement fails; the transaction
/// is rolled back in both cases.
pub async fn replace_research_result(
    pool: &PgPool,
    request_id: Uuid,
    report: &ResearchReport,
) -> Result<ResearchResultRow, DbError> {
    let mut tx = pool.begin().await?;
    let row = write_result(&mut tx, request_id, report).await?;
    tx.commit().await?;
    Ok(row)
}

/// Stores the result and moves the request to `completed` in one
/// transaction, so a request that was swept or failed meanwhile never ends
/// up with a result row.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the request is not
/// `processing`, or [`DbError::Sqlx`] if a statement fails.
pub async fn complete_with_result(
    pool: &PgPool,
    request_id: Uuid,
    report: &ResearchReport,
) -> Result<ResearchResultRow, DbError> {
    let mut tx = pool.begin().await?;
    let row = write_result(&mut tx, request_id, report).await?;
    research_requests::complete_research_request(&mut *tx, request_id).await?;
    tx.commit().await?;
    Ok(row)
}

async fn write_result(
    conn: &mut PgConnection,
    request_id: Uuid,
    report: &ResearchReport,
) -> Result<ResearchResultRow, DbError> {
    let draft = ResearchResultRow::from_report(request_id, report)?;

    let locked = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM research_requests \
         WHERE id = $1 AND status = 'processing' \
         FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?;
    if locked.is_none() {
        return Err(DbError::InvalidTransition {
            id: request_id,
            expected_status: "processing",
        });
    }

    sqlx::query("DELETE FROM research_results WHERE request_id = $1")
        .bind(request_id)
        .execute(&mut *conn)
        .await?;

    let row = sqlx::query_as::<_, ResearchResultRow>(
        "INSERT INTO research_results \
             (request_id, resumen_ejecutivo, patrones_dominantes, frameworks_de_ganchos, \
              analisis_de_posicionamiento, nivel_de_sofisticacion_del_mercado, \
              nivel_de_saturacion, brechas_de_mercado, oportunidades_estrategicas, \
              angulos_de_contenido_recomendados, estructuras_de_storytelling, \
              analisis_por_video) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id, request_id, resumen_ejecutivo, patrones_dominantes, \
                   frameworks_de_ganchos, analisis_de_posicionamiento, \
                   nivel_de_sofisticacion_del_mercado, nivel_de_saturacion, \
                   brechas_de_mercado, oportunidades_estrategicas, \
                   angulos_de_contenido_recomendados, estructuras_de_storytelling, \
                   analisis_por_video, created_at",
    )
    .bind(draft.request_id)
    .bind(&draft.resumen_ejecutivo)
    .bind(&draft.patrones_dominantes)
    .bind(&draft.frameworks_de_ganchos)
    .bind(&draft.analisis_de_posicionamiento)
    .bind(&draft.nivel_de_sofisticacion_del_mercado)
    .bind(&draft.nivel_de_saturacion)
    .bind(&draft.brechas_de_mercado)
    .bind(&draft.oportunidades_estrategicas)
    .bind(&draft.angulos_de_contenido_recomendados)
    .bind(&draft.estructuras_de_storytelling)
    .bind(&draft.analisis_por_video)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Fetches the result for a request, `None` until one has been stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_research_result(
    pool: &PgPool,
    request_id: Uuid,
) -> Result<Option<ResearchResultRow>, DbError> {
    let row = sqlx::query_as::<_, ResearchResultRow>(
        "SELECT id, request_id, resumen_ejecutivo, patrones_dominantes, \
                frameworks_de_ganchos, analisis_de_posicionamiento, \
                nivel_de_sofisticacion_del_mercado, nivel_de_saturacion, \
                brechas_de_mercado, oportunidades_estrategicas, \
                angulos_de_contenido_recomendados, estructuras_de_storytelling, \
                analisis_por_video, created_at \
         FROM research_results \
         WHERE request_id = $1",
    )
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintel_core::{NamedInsight, VideoAnalysis};

    #[test]
    fn from_report_uses_section_labels() {
        let mut report = ResearchReport::default();
        report.overview.dominant_patterns = vec![NamedInsight {
            name: "Listas".to_string(),
            description: "Top 5".to_string(),
        }];
        report.strategy.storytelling_structures = vec![NamedInsight {
            name: "Héroe".to_string(),
            description: String::new(),
        }];

        let row = ResearchResultRow::from_report(Uuid::nil(), &report).expect("encode");
        assert_eq!(
            row.patrones_dominantes,
            serde_json::json!([{ "pattern": "Listas", "description": "Top 5" }])
        );
        assert_eq!(
            row.estructuras_de_storytelling,
            serde_json::json!([{ "structure": "Héroe", "description": "" }])
        );
        assert_eq!(row.brechas_de_mercado, serde_json::json!([]));
        assert!(row.analisis_por_video.is_none());
    }

    #[test]
    fn from_report_encodes_video_section() {
        let report = ResearchReport {
            videos: Some(vec![VideoAnalysis::default()]),
            ..ResearchReport::default()
        };
        let row = ResearchResultRow::from_report(Uuid::nil(), &report).expect("encode");
        let videos = row.analisis_por_video.expect("videos");
        assert_eq!(videos.as_array().map(Vec::len), Some(1));
    }
}

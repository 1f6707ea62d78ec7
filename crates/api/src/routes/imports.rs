//! Spreadsheet import routes.

use std::io::Cursor;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use serde::Serialize;
use tracing::info;

use foresight_core::reconcile::ActualsReport;
use foresight_db::repositories::import::ImportRepository;

use crate::error::{ApiError, validation};
use crate::{AppState, middleware::AuthUser};

/// Creates the import routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/imports/actuals", post(import_actuals))
}

/// Response for an actuals import run.
#[derive(Debug, Serialize)]
pub struct ActualsImportResponse {
    /// Human-readable completion message.
    pub message: String,
    /// The structured reconciliation report.
    #[serde(flatten)]
    pub report: ActualsReport,
}

/// POST `/imports/actuals` - multipart workbook upload.
///
/// Reconciles the uploaded sheet against existing OB forecasts and returns
/// the full structured report (updated counts, unknown projects, unmatched
/// values) rather than burying it in the logs.
async fn import_actuals(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ActualsImportResponse>, ApiError> {
    let mut workbook: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| validation(format!("invalid multipart body: {e}")))?
    {
        let bytes = field
            .bytes()
            .await
            .map_err(|e| validation(format!("failed to read upload: {e}")))?;
        if !bytes.is_empty() {
            workbook = Some(bytes.to_vec());
            break;
        }
    }

    let Some(workbook) = workbook else {
        return Err(validation("multipart body carried no file"));
    };

    info!(
        user = %auth.user_id(),
        bytes = workbook.len(),
        "actuals import received"
    );

    let repo = ImportRepository::new((*state.db).clone(), state.import_options);
    let report = repo.import_actuals(Cursor::new(workbook)).await?;

    Ok(Json(ActualsImportResponse {
        message: "Actuals import completed".to_string(),
        report,
    }))
}

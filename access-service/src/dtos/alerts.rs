use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::AttentionState;
use crate::services::ReconcileReport;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileAllResponse {
    pub examined: usize,
    pub reset: usize,
}

impl From<ReconcileReport> for ReconcileAllResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            examined: report.examined,
            reset: report.reset,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttentionStateResponse {
    pub principal_id: Uuid,
    pub attention: AttentionState,
}

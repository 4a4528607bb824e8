use crate::dtos::{DispatchRequest, DispatchResponse};
use crate::services::dispatch::{DispatchError, DispatchReceipt};
use crate::services::metrics::record_dispatch;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

pub async fn dispatch_workflow(
    State(state): State<AppState>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, DispatchError> {
    match send(&state, payload).await {
        Ok(receipt) => {
            record_dispatch("dispatched");
            Ok(Json(DispatchResponse {
                message: "Workflow dispatched successfully".to_string(),
                event_type: receipt.event_type,
                repository: receipt.repository,
                timestamp: receipt.timestamp,
            }))
        }
        Err(e) => {
            record_dispatch(e.outcome());
            Err(e)
        }
    }
}

async fn send(
    state: &AppState,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<DispatchReceipt, DispatchError> {
    let Json(request) =
        payload.map_err(|rejection| DispatchError::Validation(rejection.body_text()))?;
    let command = request.into_command()?;
    state.dispatcher.dispatch(&command).await
}

use crate::dtos::{CreateFormRequest, FormResponse, MessageResponse, UpdateFormRequest};
use crate::services::metrics::record_form_mutation;
use crate::services::repository::form_not_found;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

pub async fn list_forms(State(state): State<AppState>) -> Result<Json<Vec<FormResponse>>, AppError> {
    let forms = state.repository.list().await?;
    Ok(Json(forms.into_iter().map(FormResponse::from).collect()))
}

pub async fn get_form(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FormResponse>, AppError> {
    let form = state
        .repository
        .find_by_name(&name)
        .await?
        .ok_or_else(form_not_found)?;
    Ok(Json(FormResponse::from(form)))
}

pub async fn create_form(
    State(state): State<AppState>,
    payload: Result<Json<CreateFormRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FormResponse>), AppError> {
    let input = json_body(payload)?.into_new_form()?;

    let form = state.repository.create(input).await?;
    record_form_mutation("create");

    Ok((StatusCode::CREATED, Json(FormResponse::from(form))))
}

pub async fn update_form(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<UpdateFormRequest>, JsonRejection>,
) -> Result<Json<FormResponse>, AppError> {
    let changes = json_body(payload)?.into_changes()?;

    let form = state
        .repository
        .update(&name, changes)
        .await?
        .ok_or_else(form_not_found)?;
    record_form_mutation("update");

    Ok(Json(FormResponse::from(form)))
}

pub async fn delete_form(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.repository.delete(&name).await? {
        return Err(form_not_found());
    }
    record_form_mutation("delete");

    Ok(Json(MessageResponse::new("Form deleted")))
}

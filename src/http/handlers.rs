use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::employee::EmployeeInput;
use crate::repository::Store;
use crate::service::{EmployeeService, ServiceError};

use super::dto::{EmployeeBody, EmployeeView};
use super::error::ApiError;

type Service<S> = State<Arc<EmployeeService<S>>>;

/// Run a blocking service call off the async runtime.
async fn blocking<T, F>(uri: &Uri, work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(|err| ApiError::service(err, uri)),
        Err(err) => Err(ApiError::internal(format!("worker task failed: {err}"), uri)),
    }
}

fn input_from(body: Result<Json<EmployeeBody>, JsonRejection>, uri: &Uri) -> Result<EmployeeInput, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text(), uri))?;
    body.validate(Utc::now().date_naive())
        .map_err(|problems| ApiError::validation(problems, uri))
}

fn id_from(id: Result<Path<Uuid>, PathRejection>, uri: &Uri) -> Result<Uuid, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text(), uri))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// `POST /employees`
pub async fn create_employee<S: Store + 'static>(
    State(service): Service<S>,
    uri: Uri,
    body: Result<Json<EmployeeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<EmployeeView>), ApiError> {
    let input = input_from(body, &uri)?;
    let employee = blocking(&uri, move || service.create(input)).await?;
    Ok((StatusCode::CREATED, Json(employee.into())))
}

/// `GET /employees`
pub async fn list_employees<S: Store + 'static>(
    State(service): Service<S>,
    uri: Uri,
) -> Result<Json<Vec<EmployeeView>>, ApiError> {
    let employees = blocking(&uri, move || service.list()).await?;
    Ok(Json(employees.into_iter().map(EmployeeView::from).collect()))
}

/// `GET /employees/:id`
pub async fn get_employee<S: Store + 'static>(
    State(service): Service<S>,
    id: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<Json<EmployeeView>, ApiError> {
    let id = id_from(id, &uri)?;
    let employee = blocking(&uri, move || service.get(id)).await?;
    Ok(Json(employee.into()))
}

/// `PUT /employees/:id`
pub async fn update_employee<S: Store + 'static>(
    State(service): Service<S>,
    id: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
    body: Result<Json<EmployeeBody>, JsonRejection>,
) -> Result<Json<EmployeeView>, ApiError> {
    let id = id_from(id, &uri)?;
    let input = input_from(body, &uri)?;
    let employee = blocking(&uri, move || service.update(id, input)).await?;
    Ok(Json(employee.into()))
}

/// `DELETE /employees/:id`
pub async fn delete_employee<S: Store + 'static>(
    State(service): Service<S>,
    id: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<StatusCode, ApiError> {
    let id = id_from(id, &uri)?;
    blocking(&uri, move || service.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

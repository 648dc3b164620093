//! HTTP CRUD front end for [`EmployeeService`] (feature `http`).
//!
//! ## Routes
//!
//! - `POST /employees`: create, `201` with the stored employee.
//! - `GET /employees`: list, ordered by email.
//! - `GET /employees/:id`: fetch one, `404` if unknown.
//! - `PUT /employees/:id`: replace every field.
//! - `DELETE /employees/:id`: `204` on success.
//! - `GET /health`: `{ "ok": true }`.
//!
//! Bodies use camelCase field names (`fullName`). Validation failures and
//! email conflicts answer `400`, unknown ids `404`, storage failures `500`,
//! all with an [`ErrorBody`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use outbox_relay::{http, EmployeeService, InMemoryStore};
//!
//! # async fn run() -> std::io::Result<()> {
//! let service = Arc::new(EmployeeService::new(InMemoryStore::new()));
//! http::serve(service, "127.0.0.1:8080").await
//! # }
//! ```

mod dto;
mod error;
mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::repository::Store;
use crate::service::EmployeeService;

pub use dto::{EmployeeBody, EmployeeView, ErrorBody};
pub use error::ApiError;

/// Build the router, to serve directly or merge into a larger app.
pub fn router<S: Store + 'static>(service: Arc<EmployeeService<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/employees",
            get(handlers::list_employees::<S>).post(handlers::create_employee::<S>),
        )
        .route(
            "/employees/:id",
            get(handlers::get_employee::<S>)
                .put(handlers::update_employee::<S>)
                .delete(handlers::delete_employee::<S>),
        )
        .with_state(service)
}

/// Bind `addr` (e.g. `"0.0.0.0:8080"`) and serve forever.
pub async fn serve<S: Store + 'static>(
    service: Arc<EmployeeService<S>>,
    addr: &str,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    serve_until(service, listener, std::future::pending()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_until<S, F>(
    service: Arc<EmployeeService<S>>,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    S: Store + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "http listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

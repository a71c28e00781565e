use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::service::ServiceError;

mod handlers;

// ============================================================================
// HTTP API
// ============================================================================
//
//   POST /order_add          -> 202 queued | 400 invalid | 502 queue failure
//   GET  /order/{order_uid}  -> 200 order  | 404 unknown | 500 store failure
//   GET  /health             -> 200 | 503 when a component is unhealthy
//   GET  /metrics            -> Prometheus text exposition
//
// Handlers only translate between HTTP and `OrderService`.
//
// ============================================================================

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Register routes. Callers provide `web::Data<OrderService>` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .route("/order_add", web::post().to(handlers::add_order))
        .route("/order/{order_uid}", web::get().to(handlers::get_order))
        .route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(handlers::metrics));
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Queue(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Validation(e) => e.to_string(),
            ServiceError::Queue(_) => "failed to queue order".to_string(),
            ServiceError::Store(_) => "failed to read order".to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

use actix_web::{web, HttpResponse, Responder};

use crate::service::{OrderService, ServiceError};

pub async fn add_order(
    service: web::Data<OrderService>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    match service.publish(&body).await {
        Ok(accepted) => Ok(HttpResponse::Accepted().json(accepted)),
        Err(e) => {
            match &e {
                ServiceError::Validation(reason) => {
                    tracing::debug!(error = %reason, "Rejected order payload")
                }
                other => tracing::error!(error = %other, "Failed to queue order"),
            }
            Err(e)
        }
    }
}

pub async fn get_order(
    service: web::Data<OrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let order_uid = path.into_inner();

    match service.get(&order_uid).await {
        Ok(Some(order)) => Ok(HttpResponse::Ok().json(order.as_ref())),
        Ok(None) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "order not found"
        }))),
        Err(e) => {
            tracing::error!(order_uid = %order_uid, error = %e, "Order lookup failed");
            Err(e)
        }
    }
}

pub async fn health(service: web::Data<OrderService>) -> impl Responder {
    let health = service.health();
    if health.overall.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(health)
    } else {
        HttpResponse::Ok().json(health)
    }
}

pub async fn metrics(service: web::Data<OrderService>) -> HttpResponse {
    match service.metrics().render() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

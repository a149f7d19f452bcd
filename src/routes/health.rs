use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use log::warn;
use serde_json::json;

use crate::store::RecordStore;

/// Health check endpoint
///
/// Pings the record store. Returns 200 with `"status": "ok"` when it answers
/// and 503 with `"status": "degraded"` when it does not.
#[get("/health")]
pub async fn health(store: web::Data<dyn RecordStore>) -> impl Responder {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "store": store.backend(),
            "timestamp": Utc::now()
        })),
        Err(e) => {
            warn!("health check: {} store did not answer: {}", store.backend(), e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "store": store.backend(),
                "timestamp": Utc::now()
            }))
        }
    }
}

use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, warn};

const SERVICE: &str = "stagebloom-client";
const SLOW_REQUEST_MS: u128 = 3000;

#[derive(Debug)]
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_request(
        &self,
        method: &str,
        path: &str,
        request_id: &str,
        status: Option<u16>,
        duration_ms: u128,
    ) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "http_request",
            "method": method,
            "path": path,
            "request_id": request_id,
            "status_code": status,
            "duration_ms": duration_ms,
            "service": SERVICE
        });

        if duration_ms > SLOW_REQUEST_MS {
            warn!("Slow request detected: {}", log_entry);
        } else {
            info!("{}", log_entry);
        }
    }

    pub fn log_error(&self, error: &str, context: HashMap<String, serde_json::Value>) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "error",
            "error_message": error,
            "service": SERVICE
        });

        for (key, value) in context {
            log_entry[key] = value;
        }

        error!("{}", log_entry);
    }

    pub fn log_business_event(
        &self,
        event_name: &str,
        user_id: Option<i64>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "business_event",
            "event_name": event_name,
            "user_id": user_id,
            "service": SERVICE
        });

        for (key, value) in metadata {
            log_entry[key] = value;
        }

        info!("{}", log_entry);
    }
}

pub static LOGGER: StructuredLogger = StructuredLogger;

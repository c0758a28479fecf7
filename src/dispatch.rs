//! Webhook test dispatcher: one outbound POST, no retries.
//!
//! This is a diagnostic, not a delivery guarantee. Failures are reported in
//! the result (and logged); the triggering HTTP call has already returned by
//! the time anything here runs.

use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookTestResult {
    Delivered { status_code: u16, response_ms: u64 },
    Failed { error: String, status: &'static str },
}

/// Fire a single test call carrying the webhook's event tag and measure the
/// round trip. Non-2xx responses still count as delivered; only transport
/// failures produce `Failed`.
pub async fn test_webhook(
    client: &reqwest::Client,
    id: i64,
    url: &str,
    event: &str,
) -> WebhookTestResult {
    let payload = serde_json::json!({ "test": true, "event": event });
    let started = Instant::now();

    match client.post(url).json(&payload).send().await {
        Ok(resp) => {
            let response_ms = started.elapsed().as_millis() as u64;
            let status_code = resp.status().as_u16();
            info!(webhook_id = id, status_code, response_ms, "webhook test delivered");
            WebhookTestResult::Delivered {
                status_code,
                response_ms,
            }
        }
        Err(e) => {
            warn!(webhook_id = id, error = %e, "webhook test failed");
            WebhookTestResult::Failed {
                error: e.to_string(),
                status: "failed",
            }
        }
    }
}

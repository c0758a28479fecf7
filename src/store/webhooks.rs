//! Webhook registrations: explicit lifecycle, no automatic creation.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::db::Db;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Webhook {
    pub id: i64,
    pub url: String,
    pub event: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct WebhookCreate {
    pub url: String,
    pub event: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Submission-time check: callback targets must be http(s) URLs. Rejected
/// registrations never reach the store.
pub fn valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Full replace on update, matching the API contract (no partial semantics).
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    pub url: String,
    pub event: String,
    pub enabled: bool,
}

impl Db {
    pub async fn create_webhook(&self, item: &WebhookCreate) -> Result<Webhook> {
        let webhook = sqlx::query_as::<_, Webhook>(
            "INSERT INTO webhooks (url, event, enabled)
             VALUES ($1, $2, $3)
             RETURNING id, url, event, enabled",
        )
        .bind(&item.url)
        .bind(&item.event)
        .bind(item.enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(webhook)
    }

    pub async fn list_webhooks(&self) -> Result<Vec<Webhook>> {
        let webhooks = sqlx::query_as::<_, Webhook>(
            "SELECT id, url, event, enabled FROM webhooks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(webhooks)
    }

    pub async fn get_webhook(&self, id: i64) -> Result<Option<Webhook>> {
        let webhook = sqlx::query_as::<_, Webhook>(
            "SELECT id, url, event, enabled FROM webhooks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(webhook)
    }

    pub async fn update_webhook(&self, id: i64, item: &WebhookUpdate) -> Result<Option<Webhook>> {
        let webhook = sqlx::query_as::<_, Webhook>(
            "UPDATE webhooks SET url = $2, event = $3, enabled = $4
             WHERE id = $1
             RETURNING id, url, event, enabled",
        )
        .bind(id)
        .bind(&item.url)
        .bind(&item.event)
        .bind(item.enabled)
        .fetch_optional(&self.pool)
        .await?;
        Ok(webhook)
    }

    pub async fn delete_webhook(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::api::server::AppState;
use crate::dispatch;
use crate::import::pipeline;
use crate::store::db::Db;
use crate::store::products::{ProductCreate, ProductPatch, ProductQuery};
use crate::store::webhooks::{valid_url, WebhookCreate, WebhookUpdate};
use actix_multipart::form::{tempfile::TempFile, MultipartForm};
use actix_web::{web, HttpResponse, Result};
use tracing::error;

/// Uniform 500 for store failures; the underlying error is logged, not leaked.
fn store_error(err: anyhow::Error) -> HttpResponse {
    error!(error = %err, "store query failed");
    HttpResponse::InternalServerError().json(Detail::new("internal error"))
}

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    let database = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        database,
        timestamp: chrono::Utc::now(),
    }))
}

// Products ------------------------------------------------------------------

pub async fn create_product(
    payload: web::Json<ProductCreate>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    match db.create_product(&payload).await {
        Ok(Some(product)) => Ok(HttpResponse::Created().json(product)),
        Ok(None) => Ok(HttpResponse::Conflict().json(Detail::new("SKU already exists"))),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn list_products(
    query: web::Query<ProductQuery>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    match db.list_products(&query).await {
        Ok(products) => Ok(HttpResponse::Ok().json(products)),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn get_product(path: web::Path<i64>, db: web::Data<Db>) -> Result<HttpResponse> {
    match db.get_product(path.into_inner()).await {
        Ok(Some(product)) => Ok(HttpResponse::Ok().json(product)),
        Ok(None) => Ok(HttpResponse::NotFound().json(Detail::new("Not found"))),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn update_product(
    path: web::Path<i64>,
    patch: web::Json<ProductPatch>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    match db.update_product(path.into_inner(), &patch).await {
        Ok(Some(product)) => Ok(HttpResponse::Ok().json(product)),
        Ok(None) => Ok(HttpResponse::NotFound().json(Detail::new("Not found"))),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn delete_product(path: web::Path<i64>, db: web::Data<Db>) -> Result<HttpResponse> {
    match db.delete_product(path.into_inner()).await {
        Ok(true) => Ok(HttpResponse::Ok().json(StatusResponse { status: "deleted" })),
        Ok(false) => Ok(HttpResponse::NotFound().json(Detail::new("Not found"))),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn delete_all_products(db: web::Data<Db>) -> Result<HttpResponse> {
    match db.delete_all_products().await {
        Ok(_) => Ok(HttpResponse::Ok().json(StatusResponse { status: "ok" })),
        Err(e) => Ok(store_error(e)),
    }
}

// Webhooks ------------------------------------------------------------------

pub async fn create_webhook(
    payload: web::Json<WebhookCreate>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    if !valid_url(&payload.url) {
        return Ok(HttpResponse::BadRequest().json(Detail::new("Invalid webhook URL")));
    }
    match db.create_webhook(&payload).await {
        Ok(webhook) => Ok(HttpResponse::Created().json(webhook)),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn list_webhooks(db: web::Data<Db>) -> Result<HttpResponse> {
    match db.list_webhooks().await {
        Ok(webhooks) => Ok(HttpResponse::Ok().json(webhooks)),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn update_webhook(
    path: web::Path<i64>,
    payload: web::Json<WebhookUpdate>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    match db.update_webhook(path.into_inner(), &payload).await {
        Ok(Some(webhook)) => Ok(HttpResponse::Ok().json(webhook)),
        Ok(None) => Ok(HttpResponse::NotFound().json(Detail::new("Webhook not found"))),
        Err(e) => Ok(store_error(e)),
    }
}

pub async fn delete_webhook(path: web::Path<i64>, db: web::Data<Db>) -> Result<HttpResponse> {
    match db.delete_webhook(path.into_inner()).await {
        Ok(true) => Ok(HttpResponse::Ok().json(StatusResponse { status: "deleted" })),
        Ok(false) => Ok(HttpResponse::NotFound().json(Detail::new("Webhook not found"))),
        Err(e) => Ok(store_error(e)),
    }
}

/// Fire a single test call for a registered webhook as a background job.
/// The outcome is logged only; it is not retrievable by the returned token.
pub async fn test_webhook(
    path: web::Path<i64>,
    db: web::Data<Db>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let webhook = match db.get_webhook(path.into_inner()).await {
        Ok(Some(w)) => w,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(Detail::new("Webhook not found")))
        }
        Err(e) => return Ok(store_error(e)),
    };

    let task_id = uuid::Uuid::new_v4().to_string();
    let http = state.http.clone();
    state.jobs.submit("webhook_test", task_id.clone(), async move {
        dispatch::test_webhook(&http, webhook.id, &webhook.url, &webhook.event).await;
        Ok(())
    });

    Ok(HttpResponse::Ok().json(TriggerResponse {
        task_id,
        status: "triggered",
    }))
}

// Import --------------------------------------------------------------------

#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "file")]
    pub file: TempFile,
}

/// Accept a CSV upload, persist it under the job token and enqueue the
/// import. Returns immediately; progress is polled via the token.
pub async fn upload_csv(
    MultipartForm(form): MultipartForm<UploadForm>,
    db: web::Data<Db>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let filename = form.file.file_name.clone().unwrap_or_default();
    if !filename.ends_with(".csv") {
        return Ok(HttpResponse::BadRequest().json(Detail::new("Only CSV files allowed")));
    }

    let task_id = uuid::Uuid::new_v4().to_string();
    let dest = state.upload_dir.join(format!("{task_id}.csv"));
    if let Err(e) = std::fs::copy(form.file.file.path(), &dest) {
        error!(error = %e, dest = %dest.display(), "failed to persist upload");
        return Ok(
            HttpResponse::InternalServerError().json(Detail::new("failed to persist upload"))
        );
    }

    let db = db.get_ref().clone();
    let progress = state.progress.clone();
    let token = task_id.clone();
    state.jobs.submit("csv_import", task_id.clone(), async move {
        pipeline::run_import(&dest, &token, &db, progress.as_ref(), pipeline::BATCH_SIZE)
            .await
            .map(|_| ())
    });

    Ok(HttpResponse::Ok().json(UploadResponse {
        task_id,
        status: "started",
    }))
}

pub async fn get_progress(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (progress, status) = state.progress.get(&path.into_inner()).await;
    Ok(HttpResponse::Ok().json(ProgressResponse { progress, status }))
}

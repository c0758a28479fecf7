// API server implementation using actix-web

use crate::api::{middleware, routes};
use crate::import::progress::{InMemoryProgress, ProgressStore};
use crate::jobs::JobQueue;
use crate::store::db::Db;
use actix_web::middleware::{Compress, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub upload_dir: PathBuf,
}

/// Shared handles handed to every request handler. The progress store is the
/// same instance the background import jobs write into.
#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<dyn ProgressStore>,
    pub jobs: JobQueue,
    pub http: reqwest::Client,
    pub upload_dir: PathBuf,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8000".to_string());

        let upload_dir =
            PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "/tmp/uploads".to_string()));

        Ok(Self {
            host,
            port,
            allowed_origins,
            upload_dir,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        std::fs::create_dir_all(&self.upload_dir).with_context(|| {
            format!("failed to create upload dir {}", self.upload_dir.display())
        })?;

        tracing::info!(
            host = %self.host,
            port = %self.port,
            upload_dir = %self.upload_dir.display(),
            "Starting product-importer API server"
        );

        let progress: Arc<dyn ProgressStore> = Arc::new(InMemoryProgress::new());
        let state = AppState {
            progress: progress.clone(),
            jobs: JobQueue::new(progress),
            http: reqwest::Client::new(),
            upload_dir: self.upload_dir.clone(),
        };

        let db_data = web::Data::new(db);
        let state_data = web::Data::new(state);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(db_data.clone())
                .app_data(state_data.clone())
                .wrap(Logger::default())
                .wrap(Compress::default())
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}

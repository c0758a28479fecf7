// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        // Products
        .route("/products", web::post().to(handlers::create_product))
        .route("/products", web::get().to(handlers::list_products))
        .route(
            "/products/delete_all",
            web::post().to(handlers::delete_all_products),
        )
        .route("/products/{id}", web::get().to(handlers::get_product))
        .route("/products/{id}", web::put().to(handlers::update_product))
        .route("/products/{id}", web::delete().to(handlers::delete_product))
        // Webhooks
        .route("/webhooks", web::post().to(handlers::create_webhook))
        .route("/webhooks", web::get().to(handlers::list_webhooks))
        .route("/webhooks/{id}", web::put().to(handlers::update_webhook))
        .route("/webhooks/{id}", web::delete().to(handlers::delete_webhook))
        .route("/webhooks/{id}/test", web::post().to(handlers::test_webhook))
        // Import
        .route("/upload", web::post().to(handlers::upload_csv))
        .route("/progress/{task_id}", web::get().to(handlers::get_progress));
}

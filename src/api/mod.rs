// HTTP API for the product catalog: CRUD, CSV upload, progress polling.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;

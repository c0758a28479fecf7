// Catalog store: connection handling plus product/webhook queries.

pub mod db;
pub mod products;
pub mod webhooks;

pub use db::Db;

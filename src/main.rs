// Product importer API server: catalog CRUD, CSV bulk import, webhook tests.

use anyhow::Result;
use product_importer::api::ApiServer;
use product_importer::store::Db;
use product_importer::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    product_importer::logging::init_tracing("info,sqlx=warn")?;

    env_util::init_env();
    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    server.run(db).await
}

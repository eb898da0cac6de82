use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};

use congres::config::Config;
use congres::routes;
use congres::session::SessionVerifier;
use congres::store::{initialize_db_pool, MemoryStore, PgStore, Store};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // shared by every worker
    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = initialize_db_pool(url, config.database_pool_size).map_err(|e| {
                log::error!("failed to create database pool: {}", e);
                io::Error::new(io::ErrorKind::Other, e.to_string())
            })?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            log::warn!("DATABASE_URL is not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let store = web::Data::from(store);
    let verifier = web::Data::new(SessionVerifier::new(&config.session_secret, config.admin_emails.clone()));

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(verifier.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

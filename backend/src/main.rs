mod config;
mod ingest;
mod media;
mod prediction;
mod routes;
mod storage;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use ingest::IngestionHandler;
use prediction::PredictionClient;
use routes::configure_routes;
use std::sync::Arc;
use storage::{ImageStore, MemoryImageStore, SqliteImageStore};

/// `DATABASE_URL` value selecting the process-local store.
const MEMORY_STORE: &str = "memory";

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let store: Arc<dyn ImageStore> = if config.database_url == MEMORY_STORE {
        log::warn!("Using in-memory image store; uploads are lost on restart");
        Arc::new(MemoryImageStore::new())
    } else {
        let store = SqliteImageStore::connect(&config.database_url)
            .await
            .map_err(|e| startup_error("Failed to open image store", e))?;
        Arc::new(store)
    };

    let classifier = PredictionClient::new(&config.classifier_base_url, config.classifier_timeout)
        .map_err(|e| startup_error("Failed to build classifier client", e))?;
    log::info!(
        "Classifier endpoint: {} (timeout {:?})",
        classifier.endpoint(),
        config.classifier_timeout
    );
    log::info!("Maximum upload size: {} bytes", config.max_upload_bytes);

    let handler = web::Data::new(IngestionHandler::new(
        store.clone(),
        classifier,
        config.max_upload_bytes,
    ));
    let store_data: web::Data<dyn ImageStore> = web::Data::from(store);

    let bind_address = format!("{}:{}", config.bind_address, config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(handler.clone())
            .app_data(store_data.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

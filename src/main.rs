mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, StorageBackend};
use crate::database::{DocumentStore, MemoryStore, MongoDB};
use crate::state::AppState;

async fn open_store(config: &Config) -> io::Result<Arc<dyn DocumentStore>> {
    match config.storage {
        StorageBackend::MongoDB => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let db = MongoDB::new(url)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to connect to MongoDB: {}", e)))?;
            log::info!("✅ MongoDB connected successfully");
            Ok(Arc::new(db))
        }
        StorageBackend::Memory => {
            log::warn!("⚠️  Using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default();
    for origin in origins {
        cors = cors.allowed_origin(origin);
    }

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CACHE_CONTROL,
        ])
        .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    log::info!("🚀 Starting Assignmate Service...");
    log::info!("📊 Storage backend: {:?}", config.storage);
    if config.jwt.secret == config::JwtConfig::default().secret {
        log::warn!("⚠️  JWT_SECRET not set, using the development default");
    }

    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::new(store, &config));

    let (host, port) = (config.host.clone(), config.port);
    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI document at: http://{}:{}/api-docs/openapi.json", host, port);

    let origins = config.cors_origins.clone();

    // Start HTTP server
    HttpServer::new(move || {
        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap(cors(&origins))
            .wrap(middleware::SecurityHeaders)
            .wrap(middleware::RequestMetrics)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}

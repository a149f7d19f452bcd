use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::{error, info, warn};

use taskguard::auth::{ensure_admin, AuthMiddleware};
use taskguard::config::Config;
use taskguard::logging;
use taskguard::routes::{self, health};
use taskguard::store::{MemoryStore, PgStore, RecordStore};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .map_err(|e| startup_error("Failed to connect to database", e))?;
            store
                .migrate()
                .await
                .map_err(|e| startup_error("Failed to run migrations", e))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    logging::init(&config.log_level);

    let store = open_store(&config).await?;

    if let Some(admin) = &config.admin {
        ensure_admin(store.as_ref(), &admin.username, &admin.password)
            .await
            .map_err(|e| startup_error("Failed to bootstrap admin account", e))?;
    }

    let store: web::Data<dyn RecordStore> = web::Data::from(store);
    info!(
        "Starting TaskGuard server at {} ({} store)",
        config.server_url(),
        store.backend()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(logging::request_logger())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}

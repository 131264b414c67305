//! Server entry-point: wires the repair routes over a shared backend handle.

use std::env;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::{fmt, EnvFilter};

use rehaportal::api;
use rehaportal::prelude::{Backend, Config};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        eprintln!("tracing init failed: {}", e);
    }

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let backend = Backend::new(config).map_err(std::io::Error::other)?;
    let backend = web::Data::new(backend);

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    HttpServer::new(move || {
        App::new()
            .app_data(backend.clone())
            .configure(api::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

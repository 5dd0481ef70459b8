use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::{io, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod database;
mod error;
mod events;
mod models;
mod progress;
mod routes;
mod state;
mod tribe;

use auth::{IdentityMiddlewareFactory, TokenVerifier};
use config::Config;
use events::EventBus;
use progress::source::MongoProgressSource;
use state::AppState;
use tribe::TribeClient;

fn startup_error(error: error::AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("brilliant_os_server=info,actix_web=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    let db = database::connect(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(startup_error)?;
    let verifier =
        TokenVerifier::from_rsa_pem_file(&config.firebase_public_key, &config.firebase_project_id)
            .map_err(startup_error)?;

    let events = EventBus::default();
    actix_web::rt::spawn(events::log_events(events.subscribe()));

    let source = Arc::new(MongoProgressSource::new(db.clone()));
    let state = web::Data::new(AppState {
        db,
        source: source.clone(),
        users: source,
        tribe: TribeClient::new(&config.tribe_api_url, &config.tribe_api_token),
        events,
        verifier,
        settings: config.settings(),
    });

    tracing::info!(host = %config.host, port = config.port, "starting http server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(IdentityMiddlewareFactory)
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

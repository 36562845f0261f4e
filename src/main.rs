#[macro_use]
extern crate rocket;

mod api;
mod config;
mod engine;
mod error;
mod model_host;
mod types;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use model_host::ModelHost;

#[launch]
fn rocket() -> _ {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    // Load the model before the listener starts; a failure leaves the host
    // unavailable and the server running in a degraded state.
    let host = Arc::new(ModelHost::initialize());

    rocket::custom(config.figment())
        .manage(host)
        .mount("/", routes![api::generate, api::health])
}

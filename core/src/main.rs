mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_auth::{AuthClient, services::auth_client::SessionProvider};
use api_billing::{BillingProvider, StripeBilling};
use common::{env_config::Config, http};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(config.is_production()).expect("Failed to set up logger");
    }

    // external services
    let sessions: Arc<dyn SessionProvider> =
        Arc::new(AuthClient::new(config.auth_service_url.clone()));
    let billing: Arc<dyn BillingProvider> = Arc::new(StripeBilling::new(
        &config.stripe_secret_key,
        &config.stripe_api_base,
    ));

    log::info!(
        "Starting in {} mode on {}:{} with {} workers",
        config.environment,
        config.server_host,
        config.server_port,
        config.num_workers
    );
    if !config.is_production() {
        log::debug!("Auth service at {}", config.auth_service_url);
    }

    let rate_limit = config.rate_limit_per_second;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(sessions.clone()))
            .app_data(web::Data::new(billing.clone()))
            .app_data(http::json_config())
            .app_data(http::query_config())
            .wrap(api_auth::session_middleware(sessions.clone())) // 4th
            .wrap(logger::middleware()) // 3rd
            .wrap(limiter::global_middleware(rate_limit)) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(api_billing::mount_billing())
                    .service(api_billing::mount_pricing())
                    .service(api_billing::mount_usage_events()),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}

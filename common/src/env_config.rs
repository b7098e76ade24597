use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Holds everything needed to run the service: where to bind, how to reach the
/// external auth service and Stripe, which origin may call us and how chatty
/// the logs should be.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// Base URL of the external session-cookie auth service.
    pub auth_service_url: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Base URL for Stripe REST calls not covered by the SDK (billing meters).
    pub stripe_api_base: String,
    /// Public URL of the web app, used for checkout success/cancel redirects.
    pub app_base_url: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Requests per second accepted by the global limiter.
    pub rate_limit_per_second: u32,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads `.env` first, then reads the process environment.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `AUTH_SERVICE_URL`: base URL of the auth service
    /// - `STRIPE_SECRET_KEY`: Stripe API secret key
    ///
    /// Optional (with defaults):
    /// - `STRIPE_API_BASE`: (default: "https://api.stripe.com")
    /// - `APP_BASE_URL`: (default: "http://localhost:3000")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `RATE_LIMIT_PER_SECOND`: Global request budget (default: 10)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).unwrap_or_else(|| panic!("{} must be set", key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Config {
            environment: required("ENVIRONMENT"),
            auth_service_url: required("AUTH_SERVICE_URL")
                .trim_end_matches('/')
                .to_string(),
            stripe_secret_key: required("STRIPE_SECRET_KEY"),
            stripe_api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
            app_base_url: or_default("APP_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            server_host: or_default("IP", "127.0.0.1"),
            server_port: or_default("PORT", "8080").parse().unwrap_or(8080),
            num_workers: or_default("WORKERS", "4").parse().unwrap_or(4),
            cors_allowed_origin: or_default("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
            console_logging_enabled: or_default("ENABLE_CONSOLE_LOGGING", "true").to_lowercase()
                == "true",
            rate_limit_per_second: or_default("RATE_LIMIT_PER_SECOND", "10")
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or(10),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

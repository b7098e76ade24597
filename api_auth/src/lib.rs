use std::sync::Arc;

use actix_web::web;
use middleware::auth::SessionGate;
use services::auth_client::SessionProvider;

pub mod middleware {
    pub mod auth;
}

pub mod models {
    pub mod session;
}

pub mod routes {
    pub mod proxy;
    pub mod session;
}

pub mod services {
    pub mod auth_client;
}

pub use models::session::{AuthSession, SessionUser};
pub use services::auth_client::AuthClient;

/// Routes owned by the auth service. `/session` is answered locally, the
/// rest is relayed untouched.
pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::session::get_session)
        .service(routes::proxy::forward_to_auth_service)
}

// Session gate middleware
pub fn session_middleware(provider: Arc<dyn SessionProvider>) -> SessionGate {
    SessionGate::new(provider)
}

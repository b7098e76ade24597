use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, http::header, web};

use crate::services::auth_client::SessionProvider;

/// Returns the current session as reported by the auth service.
///
/// # Output
/// - Success: the session object (`{ session, user }`), or `null` when the
///   request carries no live session
/// - Error: 500 when the auth service cannot be reached
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/session', { credentials: 'include' });
/// const session = await response.json();
/// if (!session) window.location.href = '/sign-in';
/// ```
#[get("/session")]
pub async fn get_session(
    req: HttpRequest,
    provider: web::Data<Arc<dyn SessionProvider>>,
) -> impl Responder {
    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());

    match provider.get_session(cookie).await {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(e) => {
            log::error!("Failed to fetch session: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "Internal server error" }))
        }
    }
}

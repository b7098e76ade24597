use std::sync::Arc;

use actix_web::{
    HttpRequest, HttpResponse, Responder,
    http::{StatusCode, header},
    route, web,
};
use common::error::{AppError, Res};

use crate::services::auth_client::{ForwardRequest, SessionProvider};

/// Relays sign-in, sign-up, sign-out and every other auth call to the auth
/// service, passing cookies both ways so the browser ends up holding the
/// auth service's session cookie.
#[route("/{tail:.*}", method = "GET", method = "POST")]
pub async fn forward_to_auth_service(
    req: HttpRequest,
    body: web::Bytes,
    provider: web::Data<Arc<dyn SessionProvider>>,
) -> Res<impl Responder> {
    let header_str = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let path = match req.uri().query() {
        Some(query) => format!("{}?{}", req.path(), query),
        None => req.path().to_string(),
    };

    let forwarded = provider
        .forward(ForwardRequest {
            method: req.method().to_string(),
            path,
            cookie: header_str(header::COOKIE),
            content_type: header_str(header::CONTENT_TYPE),
            body: body.to_vec(),
        })
        .await?;

    let status = StatusCode::from_u16(forwarded.status)
        .map_err(|_| AppError::Internal(format!("Invalid upstream status {}", forwarded.status)))?;

    let mut response = HttpResponse::build(status);
    if let Some(content_type) = forwarded.content_type {
        response.insert_header((header::CONTENT_TYPE, content_type));
    }
    for cookie in forwarded.set_cookies {
        response.append_header((header::SET_COOKIE, cookie));
    }
    Ok(response.body(forwarded.body))
}

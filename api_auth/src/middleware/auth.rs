//! # Session Gate Middleware
//!
//! Every request except the public ones must carry a session cookie that the
//! external auth service recognises. Page loads without a session are sent to
//! `/sign-in`; API calls get a 401.
//!
//! ## Usage
//! ```rust,ignore
//! App::new()
//!     .wrap(api_auth::session_middleware(Arc::new(AuthClient::new(url))))
//! ```

use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use common::{error::AppError, http::temporary_redirect};
use futures::future::{Ready, ok};

use crate::services::auth_client::SessionProvider;

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const SIGN_UP_PATH: &str = "/sign-up";

const PUBLIC_PREFIXES: [&str; 3] = ["/api/auth", "/_next/static", "/_next/image"];
const STATIC_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Paths reachable without a session: auth endpoints, the sign-in/up pages
/// and static assets.
pub fn is_public_path(path: &str) -> bool {
    if path == SIGN_IN_PATH || path == SIGN_UP_PATH || path == "/favicon.ico" {
        return true;
    }
    if PUBLIC_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{}/", prefix)))
    {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub struct SessionGate {
    provider: Arc<dyn SessionProvider>,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        SessionGate { provider }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionGateService {
            service: Rc::new(service),
            provider: self.provider.clone(),
        })
    }
}

pub struct SessionGateService<S> {
    service: Rc<S>,
    provider: Arc<dyn SessionProvider>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);

        if is_public_path(req.path()) {
            return Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) });
        }

        let cookie = req
            .headers()
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let provider = self.provider.clone();

        Box::pin(async move {
            match provider.get_session(cookie.as_deref()).await {
                Ok(Some(session)) => {
                    // handlers read the session through web::ReqData<AuthSession>
                    req.extensions_mut().insert(session);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Ok(None) if is_api_path(req.path()) => Ok(req.error_response(
                    AppError::Unauthorized("No session found".to_string()),
                )),
                Ok(None) => Ok(req.into_response(temporary_redirect(SIGN_IN_PATH))),
                Err(e) => {
                    log::error!("Session check failed for {}: {}", req.path(), e);
                    Ok(req.error_response(e))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{
        App, HttpResponse,
        http::StatusCode,
        test::{self, TestRequest},
        web,
    };
    use async_trait::async_trait;
    use common::error::Res;

    use super::*;
    use crate::{
        models::session::{AuthSession, SessionInfo, SessionUser},
        services::auth_client::{ForwardRequest, ForwardResponse},
    };

    struct CookieSessions;

    #[async_trait]
    impl SessionProvider for CookieSessions {
        async fn get_session(&self, cookie: Option<&str>) -> Res<Option<AuthSession>> {
            match cookie {
                Some("session=valid") => Ok(Some(AuthSession {
                    session: SessionInfo {
                        id: "ses_1".into(),
                        user_id: "usr_1".into(),
                        expires_at: None,
                    },
                    user: SessionUser {
                        id: "usr_1".into(),
                        email: "ada@example.com".into(),
                        name: Some("Ada".into()),
                        email_verified: true,
                    },
                })),
                Some("session=broken") => Err(AppError::Internal("auth service down".into())),
                _ => Ok(None),
            }
        }

        async fn forward(&self, _req: ForwardRequest) -> Res<ForwardResponse> {
            unreachable!("gate never forwards")
        }
    }

    async fn whoami(session: Option<web::ReqData<AuthSession>>) -> HttpResponse {
        let user = session.map(|s| s.user.id.clone()).unwrap_or_default();
        HttpResponse::Ok().body(user)
    }

    macro_rules! gated_app {
        () => {
            test::init_service(
                App::new()
                    .wrap(SessionGate::new(Arc::new(CookieSessions)))
                    .default_service(web::to(whoami)),
            )
            .await
        };
    }

    #[test]
    fn public_paths_skip_the_gate() {
        for path in [
            "/sign-in",
            "/sign-up",
            "/api/auth",
            "/api/auth/sign-in/email",
            "/_next/static/chunk.js",
            "/favicon.ico",
            "/images/hero.PNG",
        ] {
            assert!(is_public_path(path), "{path}");
        }
        for path in ["/", "/pricing", "/api/usage-events", "/api/authx", "/sign-in/extra"] {
            assert!(!is_public_path(path), "{path}");
        }
    }

    #[actix_web::test]
    async fn page_without_session_redirects_to_sign_in() {
        let app = gated_app!();
        let res = test::call_service(&app, TestRequest::get().uri("/pricing").to_request()).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), SIGN_IN_PATH);
    }

    #[actix_web::test]
    async fn api_without_session_is_unauthorized() {
        let app = gated_app!();
        let req = TestRequest::post()
            .uri("/api/usage-events")
            .insert_header((header::COOKIE, "session=stale"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_session_reaches_handler() {
        let app = gated_app!();
        let req = TestRequest::get()
            .uri("/")
            .insert_header((header::COOKIE, "session=valid"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"usr_1"));
    }

    #[actix_web::test]
    async fn public_page_passes_without_cookie() {
        let app = gated_app!();
        let res = test::call_service(&app, TestRequest::get().uri("/sign-in").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn auth_service_failure_surfaces_as_error() {
        let app = gated_app!();
        let req = TestRequest::get()
            .uri("/")
            .insert_header((header::COOKIE, "session=broken"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

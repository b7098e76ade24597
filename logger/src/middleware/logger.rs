use std::{pin::Pin, rc::Rc, sync::Arc, time::Instant};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::{self, BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    web::{self, Bytes},
};
use api_auth::AuthSession;
use colored::{ColoredString, Colorize};
use common::env_config::Config;
use futures::{
    StreamExt,
    future::{LocalBoxFuture, Ready, ready},
};
use log::{debug, info};
use serde_json::Value;

/// Logs one line per request: status, method, path, elapsed time and the
/// signed-in user. Request bodies and error responses go out at debug level.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

fn colored_status(status_code: u16) -> ColoredString {
    match status_code {
        200..=299 => status_code.to_string().green(),
        300..=399 => status_code.to_string().yellow(),
        400..=499 => status_code.to_string().bright_red(),
        _ => status_code.to_string().red(),
    }
}

fn colored_method(method: &str) -> ColoredString {
    match method {
        "GET" => method.blue(),
        "POST" => method.yellow(),
        "PUT" => method.purple(),
        "DELETE" => method.red(),
        _ => method.normal(),
    }
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();

        let console_logging_enabled = req
            .app_data::<web::Data<Arc<Config>>>()
            .map_or(true, |config| config.console_logging_enabled);
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            if !console_logging_enabled {
                return srv.call(req).await.map(|res| res.map_into_boxed_body());
            }

            let request_body = if should_capture_body(&req) {
                // Copy request body from payload and reconstruct it
                let mut payload = req.take_payload();
                let body_bytes = extract_body(&mut payload).await?;
                let request_body = if !body_bytes.is_empty() {
                    serde_json::from_slice::<Value>(&body_bytes).unwrap_or(Value::Null)
                } else {
                    Value::Null
                };
                let new_stream: Pin<
                    Box<dyn futures::Stream<Item = Result<Bytes, actix_web::error::PayloadError>>>,
                > = futures::stream::once(async move {
                    Ok::<Bytes, actix_web::error::PayloadError>(body_bytes)
                })
                .boxed();
                req.set_payload(Payload::from(new_stream));
                request_body
            } else {
                Value::Null
            };

            let res = srv.call(req).await?;

            let status = res.status();
            let elapsed_ms = started.elapsed().as_millis();
            // the session gate runs inside this middleware and leaves the session behind
            let user_id = res
                .request()
                .extensions()
                .get::<AuthSession>()
                .map(|session| session.user.id.clone());

            info!(
                "[{}] {} {}{} {} user_id={}",
                colored_status(status.as_u16()),
                colored_method(&method),
                path.bright_white(),
                if query_string.is_empty() {
                    String::new()
                } else {
                    format!("?{}", query_string)
                },
                format!("({}ms)", elapsed_ms).bright_black(),
                user_id.as_deref().unwrap_or("None").bright_blue(),
            );

            if let Some(body) = loggable_request_body(request_body) {
                debug!("  Request: {}", body.bright_green());
            }

            if is_auth_path(&path) || (!status.is_client_error() && !status.is_server_error()) {
                return Ok(res.map_into_boxed_body());
            }

            // Copy response body and reconstruct response
            let (req, res) = res.into_parts();
            let headers = res.headers().clone();
            let response_body_bytes = body::to_bytes(res.into_body())
                .await
                .map_err(|_| actix_web::error::ErrorInternalServerError("unreadable body"))?;
            debug!(
                "  Response: {}",
                String::from_utf8_lossy(&response_body_bytes).bright_yellow()
            );
            let mut new_res = HttpResponse::build(status);
            for (key, value) in headers.iter() {
                new_res.append_header((key.clone(), value.clone()));
            }
            Ok(ServiceResponse::new(req, new_res.body(response_body_bytes)))
        })
    }
}

/// Requests larger than this are passed through without their body logged.
pub const MAX_LOGGED_BODY_BYTES: u64 = 64 * 1024;

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_KEYS: [&str; 6] = ["password", "token", "secret", "otp", "code", "key"];

fn is_auth_path(path: &str) -> bool {
    path == "/api/auth" || path.starts_with("/api/auth/")
}

/// Bodies are buffered only for non-auth requests that declare a small
/// `Content-Length`; everything else streams through untouched.
fn should_capture_body(req: &ServiceRequest) -> bool {
    if is_auth_path(req.path()) {
        return false;
    }
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .is_some_and(|len| len > 0 && len <= MAX_LOGGED_BODY_BYTES)
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|needle| key.contains(needle))
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Non-empty JSON object bodies, with credential-like fields masked.
fn loggable_request_body(mut body: Value) -> Option<String> {
    if !body.as_object().is_some_and(|map| !map.is_empty()) {
        return None;
    }
    redact(&mut body);
    serde_json::to_string(&body).ok()
}

async fn extract_body(payload: &mut Payload) -> Result<Bytes, Error> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, Once};

    use actix_web::{
        App, HttpRequest, HttpResponse,
        http::StatusCode,
        test::{self, TestRequest},
        web,
    };
    use serde_json::json;

    use super::*;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static INSTALL: Once = Once::new();

    struct CaptureLog;

    impl log::Log for CaptureLog {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            CAPTURED.lock().unwrap().push(record.args().to_string());
        }

        fn flush(&self) {}
    }

    fn capture_logs() {
        INSTALL.call_once(|| {
            log::set_logger(&CaptureLog).unwrap();
            log::set_max_level(log::LevelFilter::Debug);
        });
    }

    async fn echo(body: web::Bytes) -> HttpResponse {
        HttpResponse::Ok().body(body)
    }

    async fn fail(_req: HttpRequest) -> HttpResponse {
        HttpResponse::BadRequest()
            .insert_header(("x-trace", "1"))
            .json(serde_json::json!({ "error": "nope" }))
    }

    #[actix_web::test]
    async fn request_body_survives_logging() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new())
                .route("/echo", web::post().to(echo)),
        )
        .await;
        let req = TestRequest::post()
            .uri("/echo")
            .set_payload(r#"{"amount":1}"#)
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(br#"{"amount":1}"#));
    }

    #[actix_web::test]
    async fn error_responses_are_rebuilt_intact() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new())
                .route("/fail", web::get().to(fail)),
        )
        .await;
        let res = test::call_service(&app, TestRequest::get().uri("/fail").to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers().get("x-trace").unwrap(), "1");
        let body = test::read_body(res).await;
        assert_eq!(body, web::Bytes::from_static(br#"{"error":"nope"}"#));
    }

    #[test]
    fn status_colors_follow_class() {
        colored::control::set_override(false);
        assert_eq!(colored_status(204).to_string(), "204");
        assert_eq!(colored_method("PATCH").to_string(), "PATCH");
    }

    #[actix_web::test]
    async fn sign_in_credentials_never_reach_the_log() {
        capture_logs();
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new())
                .route("/api/auth/sign-in/email", web::post().to(echo))
                .route("/api/usage-events", web::post().to(echo)),
        )
        .await;

        let sign_in = r#"{"email":"ada@example.com","password":"hunter2"}"#;
        let req = TestRequest::post()
            .uri("/api/auth/sign-in/email")
            .set_payload(sign_in)
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(sign_in.as_bytes()));

        let req = TestRequest::post()
            .uri("/api/usage-events")
            .set_payload(r#"{"usageMeterSlug":"fast_generations","secretToken":"s3cr3t-value"}"#)
            .to_request();
        test::call_service(&app, req).await;

        let captured = CAPTURED.lock().unwrap();
        assert!(captured.iter().any(|line| line.contains("fast_generations")));
        assert!(!captured.iter().any(|line| line.contains("hunter2")));
        assert!(!captured.iter().any(|line| line.contains("s3cr3t-value")));
    }

    #[test]
    fn credential_fields_are_redacted_at_any_depth() {
        let body = json!({
            "email": "ada@example.com",
            "password": "hunter2",
            "profile": { "apiKey": "k-123", "name": "Ada" },
            "items": [{ "refresh_token": "r-1" }]
        });
        let logged = loggable_request_body(body).unwrap();
        assert!(logged.contains("ada@example.com"));
        assert!(logged.contains("Ada"));
        for secret in ["hunter2", "k-123", "r-1"] {
            assert!(!logged.contains(secret), "{logged}");
        }
        assert_eq!(loggable_request_body(json!({})), None);
        assert_eq!(loggable_request_body(Value::Null), None);
    }

    #[test]
    fn only_small_non_auth_bodies_are_buffered() {
        let small = TestRequest::post()
            .uri("/api/usage-events")
            .set_payload(r#"{"amount":1}"#)
            .to_srv_request();
        assert!(should_capture_body(&small));

        let auth = TestRequest::post()
            .uri("/api/auth/sign-up/email")
            .set_payload(r#"{"password":"pw"}"#)
            .to_srv_request();
        assert!(!should_capture_body(&auth));

        let huge = TestRequest::post()
            .uri("/api/usage-events")
            .insert_header((header::CONTENT_LENGTH, (MAX_LOGGED_BODY_BYTES + 1).to_string()))
            .to_srv_request();
        assert!(!should_capture_body(&huge));

        let unsized_body = TestRequest::post().uri("/api/usage-events").to_srv_request();
        assert!(!should_capture_body(&unsized_body));
    }

    #[actix_web::test]
    async fn oversized_body_streams_through_untouched() {
        let app = test::init_service(
            App::new()
                .wrap(LoggerMiddleware::new())
                .route("/echo", web::post().to(echo)),
        )
        .await;
        let payload = vec![b'a'; (MAX_LOGGED_BODY_BYTES as usize) + 10];
        let req = TestRequest::post()
            .uri("/echo")
            .set_payload(payload.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body.len(), payload.len());
    }
}

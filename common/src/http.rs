use actix_web::{HttpResponse, Responder, http::header::LOCATION, web};
use serde::Serialize;

use super::error::{AppError, Res};

/// Shorthand constructors for JSON success responses returned from handlers.
pub struct Success;
impl Success {
    pub fn created<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Created().json(body))
    }
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
}

/// Temporary redirect that keeps the request method, used to bounce
/// unauthenticated page loads to the sign-in page.
pub fn temporary_redirect(location: &str) -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, location))
        .finish()
}

/// Malformed JSON bodies answer with the same `{ "error": ... }` shape as
/// every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

#[cfg(test)]
mod tests {
    use actix_web::{
        App,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;

    #[derive(Deserialize)]
    struct Amount {
        #[allow(dead_code)]
        amount: i64,
    }

    async fn take_json(_body: web::Json<Amount>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn take_query(_query: web::Query<Amount>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn extractor_errors_are_json() {
        let app = test::init_service(
            App::new()
                .app_data(json_config())
                .app_data(query_config())
                .route("/json", web::post().to(take_json))
                .route("/query", web::get().to(take_query)),
        )
        .await;

        let req = TestRequest::post()
            .uri("/json")
            .set_json(serde_json::json!({ "amount": "1" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["error"].as_str().unwrap().starts_with("Bad request:"));

        let req = TestRequest::get().uri("/query?amount=many").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["error"].is_string());
    }

    #[test]
    fn redirect_points_at_location() {
        let res = temporary_redirect("/sign-in");
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers().get(LOCATION).unwrap(), "/sign-in");
    }
}

use actix_cors::Cors;
use actix_web::http::header;

/// Browser access for the single front-end origin. Credentials are allowed
/// so the session cookie travels with API calls.
pub fn middleware(origin: &str) -> Cors {
    Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allowed_origin(origin)
        .expose_headers(&[header::SET_COOKIE, header::LOCATION])
        .supports_credentials()
        .max_age(3600)
}

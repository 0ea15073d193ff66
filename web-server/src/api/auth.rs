// web-server/src/api/auth.rs
use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::SessionProvider;
use crate::error::ApiError;

/// Body of `POST /api/auth/verify`. Missing fields read as empty so they
/// surface as missing credentials rather than a body error.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub signature: String,
}

fn session_cookie(req: &HttpRequest, sessions: &dyn SessionProvider) -> Option<String> {
    req.cookie(sessions.cookie_name())
        .map(|c| c.value().to_string())
}

// Issue a fresh nonce, replacing any existing session
#[get("/nonce")]
pub async fn nonce(sessions: web::Data<dyn SessionProvider>) -> Result<HttpResponse, ApiError> {
    let issued = sessions.issue_nonce()?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .cookie(issued.cookie.into_cookie())
        .body(issued.nonce))
}

#[post("/verify")]
pub async fn verify(
    req: HttpRequest,
    body: web::Json<VerifyRequest>,
    sessions: web::Data<dyn SessionProvider>,
) -> Result<HttpResponse, ApiError> {
    let cookie = session_cookie(&req, sessions.get_ref());

    let verified = sessions
        .verify(cookie.as_deref(), &body.message, &body.signature)
        .map_err(|e| {
            tracing::warn!("Rejected SIWE verification: {}", e);
            e
        })?;

    Ok(HttpResponse::Ok()
        .cookie(verified.cookie.into_cookie())
        .json(json!({ "ok": true })))
}

#[get("/me")]
pub async fn me(req: HttpRequest, sessions: web::Data<dyn SessionProvider>) -> HttpResponse {
    let cookie = session_cookie(&req, sessions.get_ref());
    HttpResponse::Ok()
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .json(sessions.get_session(cookie.as_deref()))
}

#[get("/logout")]
pub async fn logout(sessions: web::Data<dyn SessionProvider>) -> HttpResponse {
    tracing::info!("Session destroyed");
    HttpResponse::Ok()
        .cookie(sessions.destroy_session().into_cookie())
        .json(json!({ "ok": true }))
}

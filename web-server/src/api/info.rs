// web-server/src/api/info.rs
use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use siwe_common::Config;

/// Settings the browser needs before it can start a sign-in
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub wallet_connect_project_id: String,
    pub chain_id: u64,
    pub domain: Option<String>,
    /// Statement the frontend puts in the message it asks the wallet to sign
    pub statement: String,
}

impl From<&Config> for PublicConfig {
    fn from(config: &Config) -> Self {
        Self {
            wallet_connect_project_id: config.wallet_connect_project_id.clone(),
            chain_id: config.siwe.chain_id,
            domain: config.siwe.domain.clone(),
            statement: config.siwe.statement.clone(),
        }
    }
}

#[get("")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "SIWE Auth Server API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/config")]
pub async fn public_config(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(PublicConfig::from(config.get_ref()))
}

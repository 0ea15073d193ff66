// web-server/src/lib.rs
pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod middleware;
pub mod profile_registry;
pub mod utils;

use std::sync::Arc;

use actix::{Actor, Addr};
use actix_web::web;
use siwe_common::seal::SealError;
use siwe_common::Config;

use crate::auth::{CookieSessionProvider, SessionProvider};
use crate::middleware::RateLimiter;
use crate::profile_registry::ProfileRegistryActor;

/// Shared state handed to every worker. Build it once, inside a running
/// actix system, then clone it into the `HttpServer` factory.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<Config>,
    pub sessions: web::Data<dyn SessionProvider>,
    pub profiles: web::Data<Addr<ProfileRegistryActor>>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, SealError> {
        let sessions: Arc<dyn SessionProvider> = Arc::new(CookieSessionProvider::from_config(&config)?);
        let profiles = ProfileRegistryActor::new().start();
        let rate_limiter = RateLimiter::from_config(&config.rate_limit);

        Ok(Self {
            config: web::Data::new(config),
            sessions: web::Data::from(sessions),
            profiles: web::Data::new(profiles),
            rate_limiter,
        })
    }
}

/// Register the state and every route on an `App`
pub fn configure_app(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(state.config.clone())
        .app_data(state.sessions.clone())
        .app_data(state.profiles.clone());
    api::configure(cfg, state.rate_limiter.clone());
}

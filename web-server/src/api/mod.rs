// web-server/src/api/mod.rs
pub mod auth;
pub mod info;
pub mod profile;

use actix_web::web;

use crate::error::json_error_handler;
use crate::middleware::RateLimiter;

pub fn configure(cfg: &mut web::ServiceConfig, rate_limiter: RateLimiter) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(
            web::scope("/api")
                .wrap(rate_limiter)
                .service(info::api_index)
                .service(info::public_config)
                .service(
                    web::scope("/auth")
                        .service(auth::nonce)
                        .service(auth::verify)
                        .service(auth::me)
                        .service(auth::logout),
                )
                .service(profile::get_profile)
                .service(profile::create_profile)
                .service(profile::update_profile),
        );
}

// web-server/src/api/profile.rs
use actix::Addr;
use actix_web::{get, post, put, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use siwe_common::models::profile::{Profile, ProfileInput};

use crate::error::ApiError;
use crate::profile_registry::{
    CreateProfile, GetProfile, ListProfiles, ProfileError, ProfileRegistryActor, UpsertProfile,
};

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

impl AddressQuery {
    fn address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

// One profile by address (an empty record when none is stored), or all of them
#[get("/profile")]
pub async fn get_profile(
    query: web::Query<AddressQuery>,
    registry: web::Data<Addr<ProfileRegistryActor>>,
) -> Result<HttpResponse, ApiError> {
    match query.address() {
        Some(address) => {
            let profile = registry
                .send(GetProfile {
                    address: address.to_string(),
                })
                .await?
                .unwrap_or_else(|| Profile::empty(address));
            Ok(HttpResponse::Ok().json(json!({ "profile": profile })))
        }
        None => {
            let profiles = registry.send(ListProfiles).await?;
            Ok(HttpResponse::Ok().json(json!({ "profiles": profiles })))
        }
    }
}

#[post("/profile")]
pub async fn create_profile(
    body: web::Json<ProfileInput>,
    registry: web::Data<Addr<ProfileRegistryActor>>,
) -> Result<HttpResponse, ApiError> {
    let profile = registry
        .send(CreateProfile {
            input: body.into_inner(),
        })
        .await??;
    Ok(HttpResponse::Ok().json(json!({ "profile": profile })))
}

#[put("/profile")]
pub async fn update_profile(
    query: web::Query<AddressQuery>,
    body: web::Json<ProfileInput>,
    registry: web::Data<Addr<ProfileRegistryActor>>,
) -> Result<HttpResponse, ApiError> {
    let address = query.address().ok_or(ProfileError::MissingAddress)?;

    let profile = registry
        .send(UpsertProfile {
            address: address.to_string(),
            input: body.into_inner(),
        })
        .await??;
    Ok(HttpResponse::Ok().json(json!({ "profile": profile })))
}

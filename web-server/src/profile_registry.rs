// web-server/src/profile_registry.rs
use actix::{Actor, Context, Handler, Message, MessageResult};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use dashmap::DashMap;
use serde_json::json;
use siwe_common::models::profile::{Profile, ProfileInput, ValidationError};
use siwe_common::truncate_address;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Address is required")]
    MissingAddress,
    #[error("Profile already exists for {0}")]
    AlreadyExists(String),
    #[error("Invalid profile: {0}")]
    Validation(#[from] ValidationError),
}

impl ResponseError for ProfileError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProfileError::MissingAddress => StatusCode::BAD_REQUEST,
            ProfileError::AlreadyExists(_) => StatusCode::CONFLICT,
            ProfileError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ProfileError::Validation(err) => json!({
                "error": "Invalid profile",
                "details": err.0.iter().map(|e| json!({
                    "field": e.field,
                    "message": e.message,
                })).collect::<Vec<_>>(),
            }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Actor message: Look up the profile stored for an address
#[derive(Message)]
#[rtype(result = "Option<Profile>")]
pub struct GetProfile {
    pub address: String,
}

/// Actor message: All stored profiles
#[derive(Message)]
#[rtype(result = "Vec<Profile>")]
pub struct ListProfiles;

/// Actor message: Create a profile; the address comes from the input body
#[derive(Message)]
#[rtype(result = "Result<Profile, ProfileError>")]
pub struct CreateProfile {
    pub input: ProfileInput,
}

/// Actor message: Create the profile for `address`, or merge into the stored one
#[derive(Message)]
#[rtype(result = "Result<Profile, ProfileError>")]
pub struct UpsertProfile {
    pub address: String,
    pub input: ProfileInput,
}

/// ProfileRegistryActor owning every profile, keyed by lowercased address
#[derive(Default)]
pub struct ProfileRegistryActor {
    profiles: Arc<DashMap<String, Profile>>,
}

impl ProfileRegistryActor {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(address: &str) -> String {
        address.trim().to_ascii_lowercase()
    }

    fn required_address(address: Option<&str>) -> Result<&str, ProfileError> {
        address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(ProfileError::MissingAddress)
    }

    fn insert_new(&self, address: &str, input: &ProfileInput) -> Profile {
        let profile = Profile::create(address, input);
        self.profiles.insert(Self::key(address), profile.clone());
        tracing::info!("Created profile for {}", truncate_address(address));
        profile
    }
}

impl Actor for ProfileRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("ProfileRegistryActor started");
    }
}

impl Handler<GetProfile> for ProfileRegistryActor {
    type Result = Option<Profile>;

    fn handle(&mut self, msg: GetProfile, _ctx: &mut Self::Context) -> Self::Result {
        self.profiles
            .get(&Self::key(&msg.address))
            .map(|entry| entry.value().clone())
    }
}

impl Handler<ListProfiles> for ProfileRegistryActor {
    type Result = MessageResult<ListProfiles>;

    fn handle(&mut self, _msg: ListProfiles, _ctx: &mut Self::Context) -> Self::Result {
        let mut profiles: Vec<Profile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        MessageResult(profiles)
    }
}

impl Handler<CreateProfile> for ProfileRegistryActor {
    type Result = Result<Profile, ProfileError>;

    fn handle(&mut self, msg: CreateProfile, _ctx: &mut Self::Context) -> Self::Result {
        let address = Self::required_address(msg.input.address.as_deref())?.to_string();
        msg.input.validate()?;

        if self.profiles.contains_key(&Self::key(&address)) {
            tracing::warn!("Profile already exists for {}", truncate_address(&address));
            return Err(ProfileError::AlreadyExists(address));
        }

        Ok(self.insert_new(&address, &msg.input))
    }
}

impl Handler<UpsertProfile> for ProfileRegistryActor {
    type Result = Result<Profile, ProfileError>;

    fn handle(&mut self, msg: UpsertProfile, _ctx: &mut Self::Context) -> Self::Result {
        let address = Self::required_address(Some(&msg.address))?;
        msg.input.validate()?;

        match self.profiles.get_mut(&Self::key(address)) {
            Some(mut entry) => {
                entry.merge(&msg.input);
                tracing::info!("Updated profile for {}", truncate_address(address));
                Ok(entry.value().clone())
            }
            None => Ok(self.insert_new(address, &msg.input)),
        }
    }
}

// common/src/models/profile.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 160;
const MAX_LOCATION_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Twitter,
    Github,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    pub platform: SocialPlatform,
    #[serde(default)]
    pub username: String,
}

/// Public profile of a wallet address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub address: String,
    pub name: String,
    pub ens_name: String,
    pub avatar: String,
    pub header: String,
    pub description: String,
    pub location: String,
    pub email: String,
    pub url: String,
    pub socialmedia: Vec<SocialMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial profile as sent by clients. Missing or empty fields are "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub address: Option<String>,
    pub name: Option<String>,
    pub ens_name: Option<String>,
    pub avatar: Option<String>,
    pub header: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub socialmedia: Option<Vec<SocialMedia>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Profile input that does not match the profile schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }
}

/// Entries shown for a profile that has not filled in any social accounts
pub fn default_socialmedia() -> Vec<SocialMedia> {
    vec![
        SocialMedia {
            platform: SocialPlatform::Twitter,
            username: String::new(),
        },
        SocialMedia {
            platform: SocialPlatform::Github,
            username: String::new(),
        },
    ]
}

fn provided(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Profile {
    /// Unsaved, empty profile returned for addresses nobody has set up yet
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
            name: String::new(),
            ens_name: String::new(),
            avatar: String::new(),
            header: String::new(),
            description: String::new(),
            location: String::new(),
            email: String::new(),
            url: String::new(),
            socialmedia: default_socialmedia(),
            created_at: None,
            updated_at: None,
        }
    }

    /// New stored profile for `address`, with unspecified fields left empty
    pub fn create(address: impl Into<String>, input: &ProfileInput) -> Self {
        let now = Utc::now();
        let mut profile = Self::empty(address);
        profile.id = Some(Uuid::new_v4());
        profile.created_at = Some(now);
        profile.updated_at = Some(now);
        profile.apply(input);
        profile
    }

    /// Overwrite every field the input provides; keep the rest.
    pub fn merge(&mut self, input: &ProfileInput) {
        self.apply(input);
        self.updated_at = Some(Utc::now());
    }

    fn apply(&mut self, input: &ProfileInput) {
        let fields: [(&mut String, &Option<String>); 8] = [
            (&mut self.name, &input.name),
            (&mut self.ens_name, &input.ens_name),
            (&mut self.avatar, &input.avatar),
            (&mut self.header, &input.header),
            (&mut self.description, &input.description),
            (&mut self.location, &input.location),
            (&mut self.email, &input.email),
            (&mut self.url, &input.url),
        ];
        for (target, value) in fields {
            if let Some(value) = provided(value) {
                *target = value.to_string();
            }
        }
        if let Some(socialmedia) = &input.socialmedia {
            self.socialmedia = socialmedia.clone();
        }
    }
}

impl ProfileInput {
    /// Check the provided fields against the profile schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        check_max_len(&mut errors, "name", &self.name, MAX_NAME_LEN);
        check_max_len(&mut errors, "description", &self.description, MAX_DESCRIPTION_LEN);
        check_max_len(&mut errors, "location", &self.location, MAX_LOCATION_LEN);
        check_url(&mut errors, "avatar", &self.avatar);
        check_url(&mut errors, "header", &self.header);
        check_url(&mut errors, "url", &self.url);

        if let Some(email) = provided(&self.email) {
            if !is_valid_email(email) {
                errors.push(FieldError {
                    field: "email",
                    message: "Invalid email format".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(errors))
        }
    }
}

fn check_max_len(errors: &mut Vec<FieldError>, field: &'static str, value: &Option<String>, max: usize) {
    if let Some(value) = provided(value) {
        if value.chars().count() > max {
            errors.push(FieldError {
                field,
                message: format!("must be at most {} characters", max),
            });
        }
    }
}

fn check_url(errors: &mut Vec<FieldError>, field: &'static str, value: &Option<String>) {
    if let Some(value) = provided(value) {
        if Url::parse(value).is_err() {
            errors.push(FieldError {
                field,
                message: "Invalid URL format".to_string(),
            });
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

    #[test]
    fn test_empty_profile_has_default_socials() {
        let profile = Profile::empty(ADDRESS);
        assert_eq!(profile.address, ADDRESS);
        assert!(profile.name.is_empty());
        assert_eq!(profile.socialmedia, default_socialmedia());
        assert!(profile.id.is_none());
    }

    #[test]
    fn test_create_applies_input() {
        let input = ProfileInput {
            name: Some("Vitalik".to_string()),
            location: Some("".to_string()),
            ..Default::default()
        };
        let profile = Profile::create(ADDRESS, &input);

        assert!(profile.id.is_some());
        assert_eq!(profile.name, "Vitalik");
        assert_eq!(profile.location, "");
        assert_eq!(profile.socialmedia, default_socialmedia());
    }

    #[test]
    fn test_merge_keeps_unprovided_fields() {
        let mut profile = Profile::create(
            ADDRESS,
            &ProfileInput {
                name: Some("Alice".to_string()),
                email: Some("alice@example.com".to_string()),
                ..Default::default()
            },
        );

        profile.merge(&ProfileInput {
            name: Some("".to_string()),
            description: Some("gm".to_string()),
            socialmedia: Some(vec![SocialMedia {
                platform: SocialPlatform::Github,
                username: "alice".to_string(),
            }]),
            ..Default::default()
        });

        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.description, "gm");
        assert_eq!(profile.socialmedia.len(), 1);
    }

    #[test]
    fn test_validate_accepts_empty_and_valid_values() {
        let input = ProfileInput {
            avatar: Some("".to_string()),
            header: Some("ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string()),
            url: Some("https://example.com".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
        assert!(ProfileInput::default().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_each_bad_field() {
        let input = ProfileInput {
            name: Some("x".repeat(101)),
            description: Some("y".repeat(161)),
            avatar: Some("not a url".to_string()),
            email: Some("alice.example.com".to_string()),
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        let fields: Vec<_> = err.fields().collect();
        assert_eq!(fields, vec!["name", "description", "avatar", "email"]);
    }

    #[test]
    fn test_email_check() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b..co"));
    }

    #[test]
    fn test_profile_wire_format() {
        let json = serde_json::to_value(Profile::empty(ADDRESS)).unwrap();
        assert_eq!(json["ensName"], "");
        assert_eq!(json["socialmedia"][0]["platform"], "twitter");
        assert!(json.get("id").is_none());
    }
}

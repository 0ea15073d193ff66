// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::siwe::SiweMessage;

/// Payload carried inside the sealed session cookie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Nonce awaiting a signed message; cleared once consumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Claims of a verified sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siwe: Option<SiweClaims>,
}

/// Verified fields of the signed SIWE message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiweClaims {
    pub address: String,
    pub chain_id: u64,
    pub nonce: String,
    pub domain: String,
    pub uri: String,
    pub version: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl From<&SiweMessage> for SiweClaims {
    fn from(message: &SiweMessage) -> Self {
        Self {
            address: message.address.to_checksum(None),
            chain_id: message.chain_id,
            nonce: message.nonce.clone(),
            domain: message.domain.clone(),
            uri: message.uri.clone(),
            version: message.version.clone(),
            issued_at: message.issued_at,
            statement: message.statement.clone().unwrap_or_default(),
            resources: message.resources.clone(),
        }
    }
}

/// Where a session stands in the sign-in handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    NonceIssued,
    Authenticated,
}

impl SessionData {
    /// Session holding only a freshly issued nonce
    pub fn with_nonce(nonce: impl Into<String>) -> Self {
        Self {
            nonce: Some(nonce.into()),
            siwe: None,
        }
    }

    /// Session promoted after a successful verification. The nonce is dropped
    /// so the same signed message cannot be replayed against it.
    pub fn authenticated(claims: SiweClaims) -> Self {
        Self {
            nonce: None,
            siwe: Some(claims),
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.siwe, &self.nonce) {
            (Some(_), _) => SessionState::Authenticated,
            (None, Some(_)) => SessionState::NonceIssued,
            (None, None) => SessionState::Empty,
        }
    }

    pub fn pending_nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }
}

/// Response body of `GET /api/auth/me`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl SessionInfo {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.address.is_some()
    }
}

impl From<&SessionData> for SessionInfo {
    fn from(session: &SessionData) -> Self {
        match &session.siwe {
            Some(claims) => Self {
                address: Some(claims.address.clone()),
                chain_id: Some(claims.chain_id),
                issued_at: Some(claims.issued_at),
            },
            None => Self::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims() -> SiweClaims {
        SiweClaims {
            address: "0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string(),
            chain_id: 1,
            nonce: "Qp5nWkZx2rLm8TbY4".to_string(),
            domain: "localhost:3000".to_string(),
            uri: "http://localhost:3000".to_string(),
            version: "1".to_string(),
            issued_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            statement: String::new(),
            resources: Vec::new(),
        }
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(SessionData::default().state(), SessionState::Empty);

        let pending = SessionData::with_nonce("Qp5nWkZx2rLm8TbY4");
        assert_eq!(pending.state(), SessionState::NonceIssued);
        assert_eq!(pending.pending_nonce(), Some("Qp5nWkZx2rLm8TbY4"));

        let authenticated = SessionData::authenticated(claims());
        assert_eq!(authenticated.state(), SessionState::Authenticated);
        assert_eq!(authenticated.pending_nonce(), None);
    }

    #[test]
    fn test_session_info_serializes_nulls() {
        let json = serde_json::to_value(SessionInfo::anonymous()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "address": null, "chainId": null, "issuedAt": null })
        );
    }

    #[test]
    fn test_session_info_from_authenticated() {
        let info = SessionInfo::from(&SessionData::authenticated(claims()));
        assert!(info.is_authenticated());
        assert_eq!(info.chain_id, Some(1));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["issuedAt"], "2024-05-01T12:00:00Z");
    }
}

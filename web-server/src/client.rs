// web-server/src/client.rs
//! HTTP client for the sign-in flow, for CLI tools and tests.
//!
//! Cookies persist in the client between calls, the way a browser would
//! keep them, so `sign_in` followed by `session` sees the signed-in state.

use alloy_signer::Signer;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use siwe_common::models::session::SessionInfo;
use siwe_common::siwe::{create_siwe_message, SiweError, SiweMessageOptions};
use siwe_common::truncate_address;
use thiserror::Error;
use url::Url;

pub const DEFAULT_STATEMENT: &str = "Sign in with Ethereum to the application.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Server URL {0} has no host")]
    NoHost(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("Could not build sign-in message: {0}")]
    Message(#[from] SiweError),
    #[error("Signing failed: {0}")]
    Signer(#[from] alloy_signer::Error),
}

#[derive(Debug, Clone)]
pub struct SignInOptions {
    pub statement: String,
    pub chain_id: u64,
    pub expiration_in_hours: i64,
    pub resources: Vec<String>,
}

impl Default for SignInOptions {
    fn default() -> Self {
        Self {
            statement: DEFAULT_STATEMENT.to_string(),
            chain_id: 1,
            expiration_in_hours: 24,
            resources: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct SiweClient {
    http: Client,
    base_url: Url,
}

impl SiweClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)?;
        if base_url.host_str().is_none() {
            return Err(ClientError::NoHost(base_url.to_string()));
        }
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self { http, base_url })
    }

    /// `host[:port]` the signed message is bound to
    pub fn domain(&self) -> String {
        let host = self.base_url.host_str().unwrap_or_default();
        match self.base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    /// Fetch a nonce, sign a message over it and exchange it for a session.
    pub async fn sign_in<S: Signer + Sync>(
        &self,
        signer: &S,
        options: SignInOptions,
    ) -> Result<SessionInfo, ClientError> {
        let nonce = self.nonce().await?;

        let mut message_options = SiweMessageOptions::new(
            self.domain(),
            self.origin(),
            signer.address(),
            options.statement,
            nonce,
        );
        message_options.chain_id = options.chain_id;
        message_options.expiration_in_hours = options.expiration_in_hours;
        message_options.resources = options.resources;
        let message = create_siwe_message(message_options)?.to_string();

        let signature = signer.sign_message(message.as_bytes()).await?;
        self.verify(&message, &format!("0x{}", hex::encode(signature.as_bytes())))
            .await?;

        tracing::info!(
            "Signed in as {}",
            truncate_address(&signer.address().to_checksum(None))
        );
        self.session().await
    }

    pub async fn nonce(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.endpoint("/api/auth/nonce")?).send().await?;
        Ok(Self::check(response).await?.text().await?)
    }

    /// Submit an already signed message
    pub async fn verify(&self, message: &str, signature: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/auth/verify")?)
            .json(&json!({ "message": message, "signature": signature }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn session(&self) -> Result<SessionInfo, ClientError> {
        let response = self.http.get(self.endpoint("/api/auth/me")?).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.endpoint("/api/auth/logout")?).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(ClientError::Server { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_and_origin() {
        let client = SiweClient::new("http://127.0.0.1:8081/app/").unwrap();
        assert_eq!(client.domain(), "127.0.0.1:8081");
        assert_eq!(client.origin(), "http://127.0.0.1:8081");
        assert_eq!(
            client.endpoint("/api/auth/me").unwrap().as_str(),
            "http://127.0.0.1:8081/api/auth/me"
        );

        let client = SiweClient::new("https://app.example.com").unwrap();
        assert_eq!(client.domain(), "app.example.com");
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(SiweClient::new("not a url"), Err(ClientError::Url(_))));
        assert!(SiweClient::new("mailto:someone@example.com").is_err());
    }
}

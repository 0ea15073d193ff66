// web-server/src/bin/siwe_login.rs
//! Sign in to a running server with a local private key and print the session.
//!
//! SIWE_PRIVATE_KEY  hex private key (required)
//! SIWE_SERVER_URL   server base URL (default http://127.0.0.1:8081)
use std::env;
use std::process::ExitCode;

use alloy_signer_local::PrivateKeySigner;
use siwe_common::setup_tracing;
use siwe_web_server::client::{SignInOptions, SiweClient};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8081";

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let key = env::var("SIWE_PRIVATE_KEY").map_err(|_| "SIWE_PRIVATE_KEY is not set")?;
    let signer: PrivateKeySigner = key.trim().parse()?;
    let server_url = env::var("SIWE_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

    let mut options = SignInOptions::default();
    if let Ok(chain_id) = env::var("NEXT_PUBLIC_CHAIN_ID") {
        options.chain_id = chain_id.parse()?;
    }

    let client = SiweClient::new(&server_url)?;
    let session = client.sign_in(&signer, options).await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = setup_tracing(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())) {
        eprintln!("Tracing already initialised: {}", e);
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Sign-in failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// web-server/tests/client_test.rs
use actix_web::App;
use alloy_primitives::B256;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use reqwest::StatusCode;
use siwe_common::Config;
use siwe_web_server::client::{ClientError, SignInOptions, SiweClient};
use siwe_web_server::{configure_app, AppState};

fn server() -> actix_test::TestServer {
    let mut config = Config::default();
    config.session.password = "complex_password_at_least_32_characters_long".to_string();
    let state = AppState::new(config).unwrap();
    actix_test::start(move || App::new().configure(|cfg| configure_app(cfg, &state)))
}

#[actix_web::test]
async fn test_client_sign_in_and_out() -> Result<(), Box<dyn std::error::Error>> {
    let srv = server();
    let client = SiweClient::new(&srv.url("/"))?;
    let signer = PrivateKeySigner::from_bytes(&B256::from([0x42u8; 32]))?;

    // 1. Nothing before signing in
    assert!(!client.session().await?.is_authenticated());

    // 2. Full nonce -> sign -> verify round
    let session = client.sign_in(&signer, SignInOptions::default()).await?;
    assert_eq!(session.address, Some(signer.address().to_checksum(None)));
    assert_eq!(session.chain_id, Some(1));

    // 3. Cookie persisted in the client
    assert_eq!(client.session().await?.address, session.address);

    // 4. Sign out drops it
    client.sign_out().await?;
    assert!(!client.session().await?.is_authenticated());
    Ok(())
}

#[actix_web::test]
async fn test_client_surfaces_server_errors() -> Result<(), Box<dyn std::error::Error>> {
    let srv = server();
    let client = SiweClient::new(&srv.url("/"))?;

    // Verify without ever asking for a nonce
    let err = client.verify("not a message", "0x00").await.unwrap_err();
    match err {
        ClientError::Server { status, message } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "No session found");
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[actix_web::test]
async fn test_client_rejects_unrepresentable_expiry() -> Result<(), Box<dyn std::error::Error>> {
    let srv = server();
    let client = SiweClient::new(&srv.url("/"))?;
    let signer = PrivateKeySigner::from_bytes(&B256::from([0x42u8; 32]))?;

    let options = SignInOptions {
        expiration_in_hours: i64::MAX,
        ..SignInOptions::default()
    };
    let err = client.sign_in(&signer, options).await.unwrap_err();
    assert!(matches!(err, ClientError::Message(_)));
    assert!(!client.session().await?.is_authenticated());
    Ok(())
}

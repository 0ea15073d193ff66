// web-server/src/main.rs
use actix_web::{get, App, HttpResponse, HttpServer, Responder};
use siwe_common::{assert_env_vars, setup_tracing, Config};
use siwe_web_server::{configure_app, AppState};

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("SIWE Auth Server")
}

fn startup_error(err: impl std::fmt::Display) -> std::io::Error {
    tracing::error!("{}", err);
    std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Setup tracing
    if let Err(e) = setup_tracing(&config.log_level) {
        eprintln!("Tracing already initialised: {}", e);
    }

    assert_env_vars().map_err(startup_error)?;
    config.validate().map_err(startup_error)?;

    // Save address before moving config into the shared state
    let server_addr = config.web_server_addr.clone();
    let state = AppState::new(config).map_err(startup_error)?;

    tracing::info!("Starting SIWE auth server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .service(index)
            .configure(|cfg| configure_app(cfg, &state))
    })
    .bind(&server_addr)?
    .run()
    .await
}

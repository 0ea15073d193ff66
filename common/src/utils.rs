// common/src/utils.rs
use std::str::FromStr;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for the server and the CLI tools.
///
/// Unknown level names fall back to `INFO`.
pub fn setup_tracing(level: &str) -> Result<(), SetGlobalDefaultError> {
    let max_level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Shorten an address for log lines, e.g. `0x71C7...976F`
pub fn truncate_address(address: &str) -> String {
    if address.len() < 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

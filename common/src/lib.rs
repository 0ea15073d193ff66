pub mod config;
pub mod models;
pub mod seal;
pub mod siwe;
pub mod utils;

pub use self::config::*;
pub use utils::*;

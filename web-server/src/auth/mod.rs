// web-server/src/auth/mod.rs
pub mod error;
pub mod provider;

pub use error::AuthError;
pub use provider::{CookieSessionProvider, IssuedNonce, SessionCookie, SessionProvider, VerifiedSession};

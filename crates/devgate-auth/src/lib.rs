//! devgate Auth: credential policy, signed session tokens and the
//! account lifecycle service.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorKind};
pub use service::{AccountService, AuthenticatedSession, RegisterInput};
pub use token::{SessionClaims, TokenKind, TokenPair, TokenService};

mod jwt;
mod session;
mod token_context;

pub use jwt::*;
pub use session::*;
pub use token_context::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken,
    /// Access token expired and there is no way to refresh it
    Expired,
    RefreshFailed,
    TokenCreation,
}

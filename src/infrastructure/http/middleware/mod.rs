pub mod auth;
pub mod context;
pub mod error;
pub mod permission;
pub mod telegram;

pub use auth::{require_auth, AppState, AuthenticatedUser, Authenticator, StaticAuthenticator};
pub use context::RequestContext;
pub use error::{ApiError, ApiResult};
pub use telegram::{TelegramInitDataAuthenticator, INIT_DATA_HEADER};

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::bot::{ConversationStore, RegistrationBot};
pub use application::repository::{GenericRepository, Repository, TeamRepository, UserRepository};
pub use config::Config;
pub use domain::context::OpContext;
pub use domain::errors::{RepositoryError, RepositoryResult};

pub mod reference;
pub mod resource;
pub mod team;
pub mod user;

pub use reference::*;
pub use resource::{InvalidResourceId, Record, Resource, ResourceId};
pub use team::*;
pub use user::*;

pub mod bot;
pub mod me;
pub mod reference;
pub mod resource;
pub mod teams;
pub mod users;

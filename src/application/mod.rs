pub mod bot;
pub mod repository;
pub mod validation;

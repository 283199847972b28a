pub mod context;
pub mod entities;
pub mod errors;
pub mod page;
pub mod ports;

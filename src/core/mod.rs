// Core domain layer
pub mod interfaces;
pub mod models;
pub mod registry;
pub mod services;

pub use interfaces::*;
pub use models::*;
pub use registry::*;
pub use services::*;

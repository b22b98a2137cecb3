mod api_key_service;
mod auth_service;

pub use api_key_service::*;
pub use auth_service::*;

mod api_key_service_impl;
mod auth_service_fake;
mod auth_service_impl;
mod credential_hasher_argon2;
mod key_generator_ed25519;
mod token_codec_jwt;

pub use api_key_service_impl::*;
pub use auth_service_fake::*;
pub use auth_service_impl::*;
pub use credential_hasher_argon2::*;
pub use key_generator_ed25519::*;
pub use token_codec_jwt::*;

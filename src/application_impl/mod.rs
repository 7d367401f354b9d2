mod argon2_hasher;
mod auth_service_impl;
mod jwt_token_codec;

pub use argon2_hasher::*;
pub use auth_service_impl::*;
pub use jwt_token_codec::*;

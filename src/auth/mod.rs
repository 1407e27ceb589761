//! Authentication for Bulletin

pub mod caller;
pub mod jwt;

pub use caller::Caller;
pub use jwt::{
    extract_token_from_header, extract_token_from_query, Claims, JwtValidator,
    TokenValidationResult,
};

//! Authentication for meme-battle
//!
//! Provides:
//! - JWT token generation and validation
//! - Password policy and hashing with Argon2
//! - Caller identity resolution from the Authorization header

pub mod identity;
pub mod jwt;
pub mod password;

pub use identity::Identity;
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{check_password_policy, hash_password, verify_password};

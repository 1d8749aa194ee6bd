//! `tally-auth`: identity primitives (tokens, password hashing, claims).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod credential;
pub mod password;
pub mod principal;
pub mod signing_key;
pub mod token;

pub use claims::{validate_claims, Claims, TokenError};
pub use credential::{Credential, NewCredential};
pub use password::{Argon2PasswordHasher, PasswordError, PasswordHasher, PasswordHasherConfig};
pub use principal::Principal;
pub use signing_key::{SigningKey, SigningKeyError};
pub use token::{Hs256JwtValidator, Hs256TokenIssuer, JwtValidator, TokenIssuer};

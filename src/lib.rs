//! githubcrypt
//!
//! Fetches the public key of a GitHub repository environment while authenticated
//! as a GitHub App installation, and encrypts secrets for it with libsodium
//! compatible sealed boxes so they can live in version control.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod secrets;
pub mod security;

#[cfg(test)]
#[path = "../test_data/test_helpers.rs"]
pub(crate) mod test_helpers;

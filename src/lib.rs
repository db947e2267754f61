//! # Classauth (Classroom Login Service)
//!
//! `classauth` verifies login credentials for the two user populations of a
//! classroom platform and hands back an opaque bearer token on success.
//!
//! ## User Kinds
//!
//! - **Teachers** are keyed by email address. The address is validated and
//!   canonicalized (trimmed, lowercase domain) before lookup.
//! - **Students** are keyed by username, matched exactly.
//!
//! Each kind lives in its own record space, so identifiers never collide across kinds.
//!
//! ## Credentials
//!
//! Passwords are stored as Argon2id PHC strings with an embedded per-hash salt.
//! Unknown identifiers and wrong passwords produce the same `401` response so the
//! endpoint cannot be used to discover which accounts exist.
//!
//! ## Tokens
//!
//! The token returned on success is a random v4 UUID. It is not persisted; session
//! storage, expiry, and revocation are left to whatever consumes the token.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

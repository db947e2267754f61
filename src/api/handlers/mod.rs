//! HTTP handlers for the login service.

pub mod health;
pub use self::health::health;

pub mod user_login;
pub use self::user_login::login;

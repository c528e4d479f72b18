//! HTTP request handlers.

pub mod auth;
pub mod characters;
pub mod common;
pub mod health;
pub mod uploads;
pub mod users;

pub use auth::*;
pub use characters::*;
pub use common::*;
pub use health::*;
pub use uploads::*;
pub use users::*;

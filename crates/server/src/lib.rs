//! HTTP API server for aifriend.
//!
//! This crate provides:
//! - Credential storage with a bounded Argon2id hashing pool
//! - Access/refresh token issuance and bearer authentication
//! - The ingestion coordinator keeping uploaded assets and rows consistent
//! - User, character and asset endpoints

pub mod auth;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod hashing;
pub mod ingest;
pub mod routes;
pub mod state;

pub use auth::{AuthenticatedUser, TraceId};
pub use credentials::{CredentialError, CredentialStore};
pub use error::ApiError;
pub use hashing::PasswordHasherPool;
pub use ingest::{
    AttemptPhase, CharacterDraft, CharacterPatch, IngestError, IngestionCoordinator, UploadAttempt,
};
pub use routes::create_router;
pub use state::{AppState, StateError};

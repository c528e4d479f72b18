//! Repository traits for metadata operations.

pub mod characters;
pub mod users;

pub use characters::CharacterRepo;
pub use users::UserRepo;

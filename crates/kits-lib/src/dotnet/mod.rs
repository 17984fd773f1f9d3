pub mod installer;
pub mod inventory;
pub mod metadata;
pub mod types;

//! Google Drive backend for fileflows.

pub mod config;
pub mod gdrive;
mod mime;
pub mod token_manager;

pub use gdrive::GDriveClient;
pub use token_manager::TokenManager;

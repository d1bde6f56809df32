//! Common utilities and shared types for the asrama portal.
//!
//! This crate provides foundational components used across all asrama crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Identity**: Token verification into a [`CurrentUser`]
//! - **ID Generation**: ULID identifiers and submission numbers via [`IdGenerator`]
//! - **Currency**: Rupiah formatting for user-facing messages
//! - **Storage**: File storage for uploaded documents, photos and payment proofs
//!
//! # Example
//!
//! ```no_run
//! use asrama_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} -> {}", config.server.port, id_gen.submission_number());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod currency;
pub mod error;
pub mod id;
pub mod identity;
pub mod storage;

pub use config::Config;
pub use currency::format_rupiah;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use identity::{Claims, CurrentUser, Role, TokenVerifier};
pub use storage::{FileStore, LocalStorage, StoredFile, UploadCategory, UploadedFile};

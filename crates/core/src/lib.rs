//! Workflows of the dormitory portal.

pub mod services;

pub use services::*;

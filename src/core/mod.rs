//! Core types and constants for field surveys

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;

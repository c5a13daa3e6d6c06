//! Data models for Costwatch

mod alert;
mod usage;

pub use alert::*;
pub use usage::*;

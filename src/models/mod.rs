//! Core data models for the procurement assistant.

mod email;
mod expense;
mod supplier;

pub use email::*;
pub use expense::*;
pub use supplier::*;

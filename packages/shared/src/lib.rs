//! Utilities shared by the pictionary server binary and its tests.

pub mod logger;
pub mod time;

//! Domain abstractions

pub mod repositories;

pub use repositories::*;

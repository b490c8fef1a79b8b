//! Arenarr service library
//!
//! The background loops that drive the acquisition pipeline; the binary in
//! `main.rs` wires them to the PostgreSQL repositories and real adapters.

pub mod jobs;

//! services/api/src/lib.rs
//!
//! The NoteCode HTTP service: storage adapters, configuration and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

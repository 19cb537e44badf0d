//! Config Module
//!
//! Centralized tuning for fragment physics, lifetimes and scheduling.

pub mod debris_config;

pub use debris_config::DebrisConfig;

//! Configuration module for the collector
//!
//! This module provides the `CollectorConfig` struct and its type-safe builder
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{CollectorConfigBuilder, Complete, WithProfile};
pub use types::{CollectorConfig, DataSource, TransactionKind};

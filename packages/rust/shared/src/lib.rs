//! Shared types, error model, configuration and HTTP plumbing for the topic annotator.
//!
//! This crate is the foundation depended on by all other topic annotator crates.
//! It provides:
//! - [`TopicAnnotatorError`] - the unified error type
//! - [`TopicCreator`] and [`AnnotationWriter`] - the capabilities the router injects
//! - Configuration ([`AppConfig`], config loading and validation)
//! - [`http`] - the signed-request helper used for every outbound call

pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{AppConfig, HttpConfig, PacConfig, ServiceConfig, SmartlogicConfig, load_config_from};
pub use error::{RemoteStatus, Result, TopicAnnotatorError};
pub use service::{AnnotationWriter, TopicCreator};
pub use types::TransactionId;

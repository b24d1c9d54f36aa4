//! Inbound HTTP surface of the topic annotator.
//!
//! [`handler`] turns requests into calls on the injected capabilities and
//! their results into responses; [`server`] runs the connection loop;
//! [`metrics`] counts and times what passes through.

pub mod handler;
pub mod metrics;
pub mod server;

pub use handler::{AppState, ServiceInfo, route};
pub use metrics::HttpMetrics;
pub use server::serve;

//! The two capabilities the inbound router depends on.
//!
//! Concrete implementations live in the Smartlogic and PAC crates and are
//! injected at startup; tests substitute their own doubles.

use async_trait::async_trait;

use crate::error::Result;

/// Creates topic concepts in the taxonomy system.
#[async_trait]
pub trait TopicCreator: Send + Sync {
    /// Create a topic labelled `pref_label` and return its concept UUID.
    ///
    /// The UUID is derived from the label, so repeating the call after a
    /// failure targets the same concept.
    async fn create_topic(&self, pref_label: &str) -> Result<String>;
}

/// Links content items to a concept in the annotations system.
#[async_trait]
pub trait AnnotationWriter: Send + Sync {
    /// Add an "about" annotation for `concept_uuid` to each content item, in order.
    ///
    /// Stops at the first failing content item; items before it stay written.
    async fn write_annotations(&self, concept_uuid: &str, content_uuids: &[String]) -> Result<()>;
}

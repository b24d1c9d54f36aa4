//! Annotation payloads exchanged with PAC.

use serde::{Deserialize, Deserializer, Serialize};

/// Predicate of the annotations this service writes.
pub const ABOUT_PREDICATE: &str = "http://www.ft.com/ontology/annotation/about";

/// Prefix turning a concept UUID into the id PAC expects.
pub const THING_ID_PREFIX: &str = "http://api.ft.com/things/";

/// A relation between a content item and a concept.
///
/// Decoding is lenient: missing or `null` fields become empty, and the
/// predicate may be spelled `Predicate` or `predicate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FetchedAnnotation")]
pub struct Annotation {
    #[serde(rename = "Predicate")]
    pub predicate: String,
    #[serde(rename = "id", skip_serializing_if = "String::is_empty")]
    pub concept_id: String,
}

/// An annotation as PAC returns it.
#[derive(Deserialize)]
struct FetchedAnnotation {
    #[serde(rename = "Predicate", default, deserialize_with = "null_as_empty")]
    predicate: String,
    #[serde(rename = "predicate", default, deserialize_with = "null_as_empty")]
    predicate_lower: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    id: String,
}

impl From<FetchedAnnotation> for Annotation {
    fn from(fetched: FetchedAnnotation) -> Self {
        let predicate = if fetched.predicate.is_empty() {
            fetched.predicate_lower
        } else {
            fetched.predicate
        };
        Self {
            predicate,
            concept_id: fetched.id,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Annotation {
    /// An "about" annotation pointing at `concept_uuid`.
    pub fn about(concept_uuid: &str) -> Self {
        Self {
            predicate: ABOUT_PREDICATE.to_string(),
            concept_id: format!("{THING_ID_PREFIX}{concept_uuid}"),
        }
    }
}

/// The full annotation list of one content item, as published to PAC.
///
/// PAC replaces the stored list with this one, so it must always carry the
/// existing annotations as well as new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationsEnvelope {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl AnnotationsEnvelope {
    /// Combine `existing` with a new "about" annotation for `concept_uuid`.
    ///
    /// No deduplication: writing the same pair twice yields two entries.
    pub fn merged(content_uuid: &str, concept_uuid: &str, existing: Vec<Annotation>) -> Self {
        let mut annotations = Vec::with_capacity(existing.len() + 1);
        annotations.push(Annotation::about(concept_uuid));
        annotations.extend(existing);
        Self {
            uuid: content_uuid.to_string(),
            annotations,
        }
    }
}

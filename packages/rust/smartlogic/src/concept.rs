//! JSON-LD concept payload accepted by the Smartlogic concept API.
//!
//! A topic is posted as:
//!
//! ```json
//! {
//!   "@id": "http://www.ft.com/thing/<uuid>",
//!   "@type": ["http://www.ft.com/ontology/Topic"],
//!   "skosxl:prefLabel": [{
//!     "@type": ["skosxl:Label"],
//!     "skosxl:literalForm": [{ "@language": "en", "@value": "<label>" }]
//!   }],
//!   "skos:topConceptOf": { "@id": "http://www.ft.com/thing/ConceptScheme/4fd43cbb-..." },
//!   "sem:guid": [{ "@value": "<uuid>" }]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Prefix of every concept URI.
pub const THING_URI_PREFIX: &str = "http://www.ft.com/thing/";

/// Ontology type of created concepts.
pub const TOPIC_TYPE_URI: &str = "http://www.ft.com/ontology/Topic";

/// Concept scheme every topic is created under.
pub const TOPIC_CONCEPT_SCHEME_URI: &str =
    "http://www.ft.com/thing/ConceptScheme/4fd43cbb-bd66-4825-86b8-f9a28d1bc366";

const LABEL_TYPE: &str = "skosxl:Label";
const LABEL_LANGUAGE: &str = "en";

/// A concept to be created in Smartlogic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDescriptor {
    #[serde(rename = "@id")]
    pub uri: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(rename = "skosxl:prefLabel", default, skip_serializing_if = "Vec::is_empty")]
    pub pref_labels: Vec<PrefLabel>,
    #[serde(rename = "skos:topConceptOf")]
    pub top_concept_of: ConceptRef,
    #[serde(rename = "sem:guid")]
    pub guid: Vec<TypedValue>,
}

/// Reference to another concept by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    #[serde(rename = "@id")]
    pub uri: String,
}

/// A bare `{"@value": ...}` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "@value")]
    pub value: String,
}

/// A SKOS-XL label node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefLabel {
    #[serde(rename = "@type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(rename = "skosxl:literalForm", default, skip_serializing_if = "Vec::is_empty")]
    pub literal_forms: Vec<LiteralForm>,
}

/// Language-tagged label text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralForm {
    #[serde(rename = "@language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "@value")]
    pub value: String,
}

impl ConceptDescriptor {
    /// Describe a new topic with a single English preferred label.
    pub fn topic(uuid: &str, pref_label: &str) -> Self {
        Self {
            uri: format!("{THING_URI_PREFIX}{uuid}"),
            types: vec![TOPIC_TYPE_URI.to_string()],
            pref_labels: vec![PrefLabel {
                types: vec![LABEL_TYPE.to_string()],
                literal_forms: vec![LiteralForm {
                    language: Some(LABEL_LANGUAGE.to_string()),
                    value: pref_label.to_string(),
                }],
            }],
            top_concept_of: ConceptRef {
                uri: TOPIC_CONCEPT_SCHEME_URI.to_string(),
            },
            guid: vec![TypedValue {
                value: uuid.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_serializes_to_json_ld() {
        let concept = ConceptDescriptor::topic("cc9fecf2-dceb-43fc-8d06-06a58105b8b0", "Poodles");
        let value = serde_json::to_value(&concept).unwrap();

        assert_eq!(
            value,
            json!({
                "@id": "http://www.ft.com/thing/cc9fecf2-dceb-43fc-8d06-06a58105b8b0",
                "@type": ["http://www.ft.com/ontology/Topic"],
                "skosxl:prefLabel": [{
                    "@type": ["skosxl:Label"],
                    "skosxl:literalForm": [{ "@language": "en", "@value": "Poodles" }]
                }],
                "skos:topConceptOf": {
                    "@id": "http://www.ft.com/thing/ConceptScheme/4fd43cbb-bd66-4825-86b8-f9a28d1bc366"
                },
                "sem:guid": [{ "@value": "cc9fecf2-dceb-43fc-8d06-06a58105b8b0" }]
            })
        );
    }

    #[test]
    fn exactly_one_pref_label() {
        let concept = ConceptDescriptor::topic("id", "Label");
        assert_eq!(concept.pref_labels.len(), 1);
        assert_eq!(concept.pref_labels[0].literal_forms.len(), 1);
    }
}

//! Topic creation against the Smartlogic concept API.
//!
//! A topic's UUID is a name-based (v3) UUID of its preferred label, so the
//! label alone is enough to recompute it and a retried creation always
//! targets the same concept.

pub mod concept;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{info, instrument};
use uuid::Uuid;

use topic_annotator_shared::http::{Credential, Payload, SignedRequest, send_signed};
use topic_annotator_shared::{Result, SmartlogicConfig, TopicCreator, TransactionId};

pub use concept::ConceptDescriptor;

/// Content type the Smartlogic API expects for concept writes.
const JSON_LD_CONTENT_TYPE: &str = "application/ld+json";

/// Derive the concept UUID for a preferred label.
pub fn derive_concept_uuid(pref_label: &str) -> Uuid {
    Uuid::new_v3(&Uuid::nil(), pref_label.as_bytes())
}

// ---------------------------------------------------------------------------
// SmartlogicService
// ---------------------------------------------------------------------------

/// Creates topics by posting JSON-LD concepts to Smartlogic.
#[derive(Debug, Clone)]
pub struct SmartlogicService {
    client: Client,
    api_key: String,
    request_url: String,
}

impl SmartlogicService {
    pub fn new(client: Client, config: &SmartlogicConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            request_url: config.request_url.clone(),
        }
    }
}

#[async_trait]
impl TopicCreator for SmartlogicService {
    #[instrument(skip_all, fields(pref_label = %pref_label))]
    async fn create_topic(&self, pref_label: &str) -> Result<String> {
        let uuid = derive_concept_uuid(pref_label).to_string();
        let concept = ConceptDescriptor::topic(&uuid, pref_label);
        let transaction_id = TransactionId::new();

        info!(%uuid, %transaction_id, "sending concept to smartlogic");

        send_signed(
            &self.client,
            SignedRequest {
                method: Method::POST,
                url: &self.request_url,
                credential: Credential::Authorization(&self.api_key),
                transaction_id: &transaction_id,
                subject: &uuid,
                body: Some(Payload::json(JSON_LD_CONTENT_TYPE, &concept)?),
            },
        )
        .await?;

        info!(%uuid, "concept created");
        Ok(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topic_annotator_shared::http::build_client;
    use topic_annotator_shared::{HttpConfig, RemoteStatus, TopicAnnotatorError};
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POODLES_UUID: &str = "85ee5ddf-4100-36a9-b961-15bd7afae392";

    fn service(server: &MockServer) -> SmartlogicService {
        let config = SmartlogicConfig {
            api_key: "sl-secret".into(),
            request_url: format!("{}/concepts", server.uri()),
        };
        SmartlogicService::new(build_client(&HttpConfig::default()).unwrap(), &config)
    }

    #[test]
    fn uuid_derivation_is_deterministic() {
        assert_eq!(derive_concept_uuid("Poodles"), derive_concept_uuid("Poodles"));
        assert_eq!(derive_concept_uuid("Poodles").to_string(), POODLES_UUID);
        assert_eq!(derive_concept_uuid("Poodles").get_version_num(), 3);
    }

    #[test]
    fn distinct_labels_get_distinct_uuids() {
        assert_ne!(derive_concept_uuid("Poodles"), derive_concept_uuid("Labradors"));
        assert_ne!(derive_concept_uuid("Poodles"), derive_concept_uuid("poodles"));
        assert_eq!(
            derive_concept_uuid("Labradors").to_string(),
            "b9aa665f-1e48-3947-aa9b-b02773c81cfa"
        );
    }

    #[tokio::test]
    async fn create_topic_posts_concept() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/concepts"))
            .and(header("authorization", "sl-secret"))
            .and(header("content-type", "application/ld+json"))
            .and(header_exists("X-Request-Id"))
            .and(body_json(
                serde_json::to_value(ConceptDescriptor::topic(POODLES_UUID, "Poodles")).unwrap(),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let uuid = service(&server).create_topic("Poodles").await.unwrap();
        assert_eq!(uuid, POODLES_UUID);
    }

    #[tokio::test]
    async fn create_topic_is_stable_across_calls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/concepts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let svc = service(&server);
        let first = svc.create_topic("X").await.unwrap_err();
        let second = svc.create_topic("X").await.unwrap_err();

        let expected = derive_concept_uuid("X").to_string();
        for err in [first, second] {
            match err {
                TopicAnnotatorError::RemoteWriteFailed { subject, .. } => {
                    assert_eq!(subject, expected);
                }
                other => panic!("expected RemoteWriteFailed, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn accepted_response_counts_as_created() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        assert!(service(&server).create_topic("Poodles").await.is_ok());
    }

    #[tokio::test]
    async fn rejection_embeds_url_status_uuid_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("label already exists"))
            .mount(&server)
            .await;

        let err = service(&server).create_topic("Poodles").await.unwrap_err();
        match err {
            TopicAnnotatorError::RemoteWriteFailed {
                url,
                status,
                subject,
                body,
            } => {
                assert_eq!(url, format!("{}/concepts", server.uri()));
                assert_eq!(status, RemoteStatus::Http(400));
                assert_eq!(subject, POODLES_UUID);
                assert_eq!(body, "label already exists");
            }
            other => panic!("expected RemoteWriteFailed, got {other:?}"),
        }
    }
}

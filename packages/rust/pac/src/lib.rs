//! Annotation writes against PAC.
//!
//! For every content item the current annotation list is read, an "about"
//! annotation for the concept is added, and the whole list is published
//! back. Content items are processed one after another and the first failure
//! ends the batch.

pub mod model;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{info, instrument};
use url::Url;

use topic_annotator_shared::http::{Credential, Payload, SignedRequest, send_signed};
use topic_annotator_shared::{AnnotationWriter, PacConfig, Result, TopicAnnotatorError, TransactionId};

pub use model::{ABOUT_PREDICATE, Annotation, AnnotationsEnvelope};

const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// AnnotationsService
// ---------------------------------------------------------------------------

/// Reads and publishes content annotations through the PAC APIs.
#[derive(Debug, Clone)]
pub struct AnnotationsService {
    client: Client,
    api_key: String,
    read_url: String,
    write_url: String,
}

impl AnnotationsService {
    pub fn new(client: Client, config: &PacConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            read_url: config.read_url.clone(),
            write_url: config.write_url.clone(),
        }
    }

    /// Fetch the current annotations of a content item.
    async fn fetch_annotations(
        &self,
        content_uuid: &str,
        transaction_id: &TransactionId,
    ) -> Result<Vec<Annotation>> {
        let url = endpoint(&self.read_url, &["content", content_uuid, "annotations"])?;

        let body = send_signed(
            &self.client,
            SignedRequest {
                method: Method::GET,
                url: &url,
                credential: Credential::ApiKey(&self.api_key),
                transaction_id,
                subject: content_uuid,
                body: None,
            },
        )
        .await?;

        serde_json::from_str(&body).map_err(|e| {
            TopicAnnotatorError::parse(format!(
                "annotations from {url} for content {content_uuid}: {e}"
            ))
        })
    }

    /// Replace the annotations of a content item with `envelope`.
    async fn publish_annotations(
        &self,
        envelope: &AnnotationsEnvelope,
        transaction_id: &TransactionId,
    ) -> Result<()> {
        let url = endpoint(
            &self.write_url,
            &["drafts", "content", &envelope.uuid, "annotations", "publish"],
        )?;

        send_signed(
            &self.client,
            SignedRequest {
                method: Method::POST,
                url: &url,
                credential: Credential::ApiKey(&self.api_key),
                transaction_id,
                subject: &envelope.uuid,
                body: Some(Payload::json(JSON_CONTENT_TYPE, envelope)?),
            },
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AnnotationWriter for AnnotationsService {
    #[instrument(skip_all, fields(concept_uuid = %concept_uuid, contents = content_uuids.len()))]
    async fn write_annotations(&self, concept_uuid: &str, content_uuids: &[String]) -> Result<()> {
        let transaction_id = TransactionId::new();

        for content_uuid in content_uuids {
            let existing = self.fetch_annotations(content_uuid, &transaction_id).await?;
            let envelope = AnnotationsEnvelope::merged(content_uuid, concept_uuid, existing);

            info!(
                %content_uuid,
                %transaction_id,
                annotations = envelope.annotations.len(),
                "sending annotations to PAC"
            );

            self.publish_annotations(&envelope, &transaction_id).await?;
        }

        Ok(())
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| TopicAnnotatorError::config(format!("invalid PAC URL {base}: {e}")))?;

    url.path_segments_mut()
        .map_err(|()| TopicAnnotatorError::config(format!("PAC URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use topic_annotator_shared::http::build_client;
    use topic_annotator_shared::{HttpConfig, RemoteStatus};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> AnnotationsService {
        let config = PacConfig {
            api_key: "pac-secret".into(),
            read_url: server.uri(),
            write_url: server.uri(),
        };
        AnnotationsService::new(build_client(&HttpConfig::default()).unwrap(), &config)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn mount_read(server: &MockServer, content_uuid: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/content/{content_uuid}/annotations")))
            .and(header("X-Api-Key", "pac-secret"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn mount_write(server: &MockServer, content_uuid: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/drafts/content/{content_uuid}/annotations/publish")))
            .and(header("X-Api-Key", "pac-secret"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(times)
            .mount(server)
            .await;
    }

    async fn published_bodies(server: &MockServer) -> Vec<(String, serde_json::Value)> {
        server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| (r.url.path().to_string(), serde_json::from_slice(&r.body).unwrap()))
            .collect()
    }

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        assert_eq!(
            endpoint("http://pac.example", &["content", "abc", "annotations"]).unwrap(),
            "http://pac.example/content/abc/annotations"
        );
        assert_eq!(
            endpoint("http://pac.example/api/", &["content", "a/b"]).unwrap(),
            "http://pac.example/api/content/a%2Fb"
        );
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let server = MockServer::start().await;
        service(&server).write_annotations("c1", &[]).await.unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_merged_lists_per_content_item() {
        let server = MockServer::start().await;

        mount_read(&server, "D1", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        mount_read(&server, "D2", ResponseTemplate::new(200).set_body_json(json!([{ "id": "X" }])))
            .await;
        mount_write(&server, "D1", 1).await;
        mount_write(&server, "D2", 1).await;

        service(&server)
            .write_annotations("C1", &ids(&["D1", "D2"]))
            .await
            .unwrap();

        let about = json!({
            "Predicate": "http://www.ft.com/ontology/annotation/about",
            "id": "http://api.ft.com/things/C1"
        });
        let published = published_bodies(&server).await;
        assert_eq!(published.len(), 2);

        assert_eq!(published[0].0, "/drafts/content/D1/annotations/publish");
        assert_eq!(published[0].1, json!({ "uuid": "D1", "annotations": [about.clone()] }));

        assert_eq!(published[1].0, "/drafts/content/D2/annotations/publish");
        assert_eq!(
            published[1].1,
            json!({ "uuid": "D2", "annotations": [about, { "Predicate": "", "id": "X" }] })
        );
    }

    #[tokio::test]
    async fn calls_are_issued_in_order_with_one_transaction_id() {
        let server = MockServer::start().await;

        mount_read(&server, "D1", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        mount_read(&server, "D2", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        mount_write(&server, "D1", 1).await;
        mount_write(&server, "D2", 1).await;

        service(&server)
            .write_annotations("C1", &ids(&["D1", "D2"]))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let calls: Vec<(String, String)> = requests
            .iter()
            .map(|r| (r.method.to_string(), r.url.path().to_string()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("GET".to_string(), "/content/D1/annotations".to_string()),
                ("POST".to_string(), "/drafts/content/D1/annotations/publish".to_string()),
                ("GET".to_string(), "/content/D2/annotations".to_string()),
                ("POST".to_string(), "/drafts/content/D2/annotations/publish".to_string()),
            ]
        );

        let tids: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("X-Request-Id").unwrap().to_str().unwrap().to_string())
            .collect();
        assert!(tids[0].starts_with("tid_"));
        assert!(tids.iter().all(|t| t == &tids[0]));
    }

    #[tokio::test]
    async fn read_failure_stops_the_batch() {
        let server = MockServer::start().await;

        mount_read(&server, "A", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        mount_read(&server, "B", ResponseTemplate::new(404).set_body_string("no such content"))
            .await;
        mount_write(&server, "A", 1).await;
        mount_write(&server, "B", 0).await;
        mount_write(&server, "C", 0).await;

        let err = service(&server)
            .write_annotations("C1", &ids(&["A", "B", "C"]))
            .await
            .unwrap_err();

        match err {
            TopicAnnotatorError::RemoteWriteFailed {
                url,
                status,
                subject,
                body,
            } => {
                assert_eq!(url, format!("{}/content/B/annotations", server.uri()));
                assert_eq!(status, RemoteStatus::Http(404));
                assert_eq!(subject, "B");
                assert_eq!(body, "no such content");
            }
            other => panic!("expected RemoteWriteFailed, got {other:?}"),
        }

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.path().contains("/C/")));
    }

    #[tokio::test]
    async fn write_failure_stops_the_batch() {
        let server = MockServer::start().await;

        mount_read(&server, "A", ResponseTemplate::new(200).set_body_json(json!([]))).await;
        Mock::given(method("POST"))
            .and(path("/drafts/content/A/annotations/publish"))
            .respond_with(ResponseTemplate::new(203))
            .expect(1)
            .mount(&server)
            .await;
        mount_write(&server, "B", 0).await;

        let err = service(&server)
            .write_annotations("C1", &ids(&["A", "B"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("returned status: 203"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn undecodable_annotations_fail_the_batch() {
        let server = MockServer::start().await;

        mount_read(&server, "A", ResponseTemplate::new(200).set_body_string("not json")).await;
        mount_write(&server, "A", 0).await;

        let err = service(&server)
            .write_annotations("C1", &ids(&["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TopicAnnotatorError::Parse { .. }));
    }
}

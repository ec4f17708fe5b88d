//! HTTP snapshot source.
//!
//! Issues `GET <url>` against a node's snapshot endpoint and decodes the
//! JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{SchemaMode, SnapshotSource};
use crate::data::Snapshot;
use crate::error::FetchError;

/// Fetches snapshots from one node over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    schema: SchemaMode,
    description: String,
}

impl HttpSource {
    /// Create a new builder for the given endpoint URL.
    pub fn builder(url: impl Into<String>) -> HttpSourceBuilder {
        HttpSourceBuilder {
            url: url.into(),
            client: None,
            schema: SchemaMode::default(),
            timeout: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        self.schema.decode(&body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug)]
pub struct HttpSourceBuilder {
    url: String,
    client: Option<Client>,
    schema: SchemaMode,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Share a client (and its connection pool) between sources.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn schema(mut self, schema: SchemaMode) -> Self {
        self.schema = schema;
        self
    }

    /// Set a request timeout. By default requests never time out, so a hung
    /// node stalls only its own poller.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpSource, FetchError> {
        let client = match (self.client, self.timeout) {
            (Some(client), None) => client,
            (_, timeout) => {
                let mut builder = Client::builder();
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                builder
                    .build()
                    .map_err(|e| FetchError::Transport(format!("cannot build HTTP client: {}", e)))?
            }
        };

        Ok(HttpSource {
            client,
            description: format!("http: {}", self.url),
            url: self.url,
            schema: self.schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const SNAPSHOT_PATH: &str = "/telematics/snapshot";

    async fn respond_with(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(SNAPSHOT_PATH))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn source_for(server: &MockServer) -> HttpSource {
        HttpSource::builder(format!("{}{}", server.uri(), SNAPSHOT_PATH))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_snapshot() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_body_string(
                r#"{"generated_transactions": 10, "confirmed_transactions": 8, "chain_depth": 5, "token": true}"#,
            ),
        )
        .await;

        let snapshot = source_for(&server).fetch().await.unwrap();
        assert_eq!(snapshot.generated_transactions, 10);
        assert_eq!(snapshot.confirmed_transactions, 8);
        assert_eq!(snapshot.chain_depth, 5);
        assert!(snapshot.token);
    }

    #[tokio::test]
    async fn test_fetch_status_error() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(503)).await;

        let err = source_for(&server).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_fetch_decode_error() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(200).set_body_string("not json")).await;

        let err = source_for(&server).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind and drop a listener so the port is closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpSource::builder(format!("http://{}{}", addr, SNAPSHOT_PATH))
            .build()
            .unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn test_builder_description() {
        let source = HttpSource::builder("http://10.0.0.1:7000/telematics/snapshot")
            .schema(SchemaMode::Strict)
            .build()
            .unwrap();
        assert_eq!(source.description(), "http: http://10.0.0.1:7000/telematics/snapshot");
        assert_eq!(source.url(), "http://10.0.0.1:7000/telematics/snapshot");
    }
}

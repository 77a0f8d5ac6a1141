//! # TinyPNG Client Module
//!
//! Strategia remota: il buffer viene inviato all'API TinyPNG e sostituito
//! con il risultato compresso.
//!
//! ## Protocollo
//! 1. `POST {endpoint}/shrink` con basic auth `api:<key>` e i byte grezzi
//! 2. Risposta `201 Created` con header `Location` (o `output.url` nel body)
//! 3. `GET` sulla location per scaricare l'immagine compressa
//!
//! Le risposte di errore (`401` credenziali, `429` quota esaurita, `415`
//! formato) diventano `OptimizeError::Service`. Nessun retry.

use crate::error::OptimizeError;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

/// Remote compression backend
#[async_trait]
pub trait CompressionService: Send + Sync {
    /// Compress `data` and return the new bytes
    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>, OptimizeError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ShrinkBody {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    url: String,
}

/// HTTP client for the TinyPNG API
#[derive(Debug, Clone)]
pub struct TinifyClient {
    http: Client,
    endpoint: String,
    key: String,
}

impl TinifyClient {
    pub fn new(endpoint: &str, key: &str) -> Result<Self, OptimizeError> {
        if key.trim().is_empty() {
            return Err(OptimizeError::MissingApiKey);
        }

        let http = Client::builder()
            .user_agent(concat!("optimized-image/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.trim().to_string(),
        })
    }

    /// Upload `data` and return the URL of the compressed result
    async fn shrink(&self, data: Vec<u8>) -> Result<Url, OptimizeError> {
        let size = data.len();
        let response = self
            .http
            .post(format!("{}/shrink", self.endpoint))
            .basic_auth("api", Some(&self.key))
            .body(data)
            .send()
            .await?;

        if let Some(count) = response.headers().get("Compression-Count") {
            info!(
                "TinyPNG compressions used this month: {}",
                count.to_str().unwrap_or("?")
            );
        }

        let response = Self::check(response).await?;
        let base = response.url().clone();

        let location = match response.headers().get(LOCATION) {
            Some(value) => value
                .to_str()
                .map_err(|e| Self::malformed(format!("invalid Location header: {}", e)))?
                .to_string(),
            None => response.json::<ShrinkBody>().await?.output.url,
        };

        let output = base
            .join(&location)
            .map_err(|e| Self::malformed(format!("invalid output url '{}': {}", location, e)))?;
        debug!("Shrunk {} bytes, result at {}", size, output);
        Ok(output)
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, OptimizeError> {
        let response = self
            .http
            .get(url)
            .basic_auth("api", Some(&self.key))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Turn a non-success response into a service error
    async fn check(response: Response) -> Result<Response, OptimizeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (kind, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.message),
            Err(_) => (
                status.canonical_reason().unwrap_or("Error").to_string(),
                text,
            ),
        };

        Err(OptimizeError::Service {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    fn malformed(message: String) -> OptimizeError {
        OptimizeError::Service {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            kind: "Malformed response".to_string(),
            message,
        }
    }
}

#[async_trait]
impl CompressionService for TinifyClient {
    async fn compress(&self, data: Vec<u8>) -> Result<Vec<u8>, OptimizeError> {
        let output = self.shrink(data).await?;
        self.download(output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::Router;

    // base64("api:secret")
    const AUTH: &str = "Basic YXBpOnNlY3JldA==";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(AUTH)
    }

    async fn shrink(headers: HeaderMap, body: Bytes) -> Response {
        if !authorized(&headers) {
            return (
                StatusCode::UNAUTHORIZED,
                r#"{"error":"Unauthorized","message":"Credentials are invalid."}"#,
            )
                .into_response();
        }
        if body.as_ref() != b"original image bytes" {
            return (
                StatusCode::BAD_REQUEST,
                r#"{"error":"BadRequest","message":"Unexpected body."}"#,
            )
                .into_response();
        }
        (
            StatusCode::CREATED,
            [(header::LOCATION, "/output/abc123"), (header::HeaderName::from_static("compression-count"), "7")],
            r#"{"input":{"size":20},"output":{"size":4,"url":"/output/abc123"}}"#,
        )
            .into_response()
    }

    async fn output(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Bytes::from_static(b"tiny").into_response()
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/shrink", post(shrink))
            .route("/output/abc123", get(output));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            TinifyClient::new("https://api.tinify.com", "  "),
            Err(OptimizeError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_compress_round_trip() {
        let endpoint = serve().await;
        let client = TinifyClient::new(&format!("{}/", endpoint), "secret").unwrap();

        let result = client.compress(b"original image bytes".to_vec()).await.unwrap();
        assert_eq!(result, b"tiny");
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let endpoint = serve().await;
        let client = TinifyClient::new(&endpoint, "wrong").unwrap();

        let err = client.compress(b"original image bytes".to_vec()).await.unwrap_err();
        assert!(err.is_credential_error());
        match err {
            OptimizeError::Service { status, kind, message } => {
                assert_eq!(status, 401);
                assert_eq!(kind, "Unauthorized");
                assert_eq!(message, "Credentials are invalid.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = TinifyClient::new(&format!("http://{}", addr), "secret").unwrap();
        let err = client.compress(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, OptimizeError::Http(_)));
    }
}

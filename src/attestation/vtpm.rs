//! Confidential Space vTPM token client over the launcher's Unix socket.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;

use crate::attestation::{AttestationProvider, TokenRequest, TokenType};
use crate::config::AttestationConfig;
use crate::error::AttestationError;

/// Token returned when attestation is simulated.
pub const SIMULATED_TOKEN: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJpc3MiOiJodHRwczovL2NvbmZpZGVudGlhbGNvbXB1dGluZy5nb29nbGVhcGlzLmNvbSIsInN1YiI6InNpbXVsYXRlZCJ9.";

const TOKEN_ENDPOINT: &str = "/v1/token";

/// Client for the attestation token endpoint.
pub struct VtpmClient {
    socket_path: PathBuf,
    audience: String,
    token_type: TokenType,
    simulate: bool,
}

impl VtpmClient {
    pub fn new(config: &AttestationConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            audience: config.audience.clone(),
            token_type: config.token_type,
            simulate: config.simulate,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_simulated(&self) -> bool {
        self.simulate
    }

    async fn post_token(&self, body: Vec<u8>) -> Result<String, AttestationError> {
        let connection_error = |reason: String| AttestationError::Connection {
            path: self.socket_path.display().to_string(),
            reason,
        };

        let stream = connect(&self.socket_path)
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!("attestation connection closed: {}", e);
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(TOKEN_ENDPOINT)
            .header(HOST, "localhost")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| AttestationError::Request(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| AttestationError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttestationError::UnexpectedStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| AttestationError::Request(e.to_string()))?
            .to_bytes();
        String::from_utf8(body.to_vec())
            .map_err(|e| AttestationError::Request(format!("token is not UTF-8: {e}")))
    }
}

#[cfg(unix)]
async fn connect(path: &Path) -> std::io::Result<tokio::net::UnixStream> {
    tokio::net::UnixStream::connect(path).await
}

#[cfg(not(unix))]
async fn connect(_path: &Path) -> std::io::Result<tokio::net::TcpStream> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Unix sockets are not available on this platform",
    ))
}

#[async_trait]
impl AttestationProvider for VtpmClient {
    fn audience(&self) -> &str {
        &self.audience
    }

    fn token_type(&self) -> TokenType {
        self.token_type
    }

    async fn request_token(&self, request: &TokenRequest) -> Result<String, AttestationError> {
        if self.simulate {
            tracing::info!(token_type = %request.token_type(), "returning simulated attestation token");
            return Ok(SIMULATED_TOKEN.to_string());
        }

        let body = serde_json::to_vec(request)
            .map_err(|e| AttestationError::Request(e.to_string()))?;
        let token = self.post_token(body).await?;
        tracing::info!(
            token_type = %request.token_type(),
            token_len = token.len(),
            "received attestation token"
        );
        Ok(token)
    }
}

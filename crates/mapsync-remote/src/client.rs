//! Hosted project server client
//!
//! Provides a typed HTTP client for the project server API. Handles
//! authentication headers, JSON deserialization, and endpoint construction.
//! The versioned-history semantics live on the server; this client only moves
//! bytes and metadata.
//!
//! ## Endpoints
//!
//! - `POST /v1/auth/login` - exchange credentials for a bearer token
//! - `GET /v1/project/{ns}/{name}` - version and file list (optionally of a
//!   specific version)
//! - `GET /v1/project/raw/{ns}/{name}` - raw file content at a version
//! - `POST /v1/project/push/{ns}/{name}` - open a push transaction
//! - `POST /v1/project/push/chunk/{tx}` - upload file content
//! - `POST /v1/project/push/finish/{tx}` - commit, returns the new version

use anyhow::{bail, Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mapsync_core::domain::{FileChange, PendingFiles, ProjectPath, ProjectVersion, ServerFile};
use mapsync_core::ports::ProjectInfo;

/// Identification sent with every request
const USER_AGENT: &str = concat!("mapsync/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Server API payloads
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Response from the project info endpoint
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    version: ProjectVersion,
    #[serde(default)]
    files: Vec<ServerFile>,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    version: &'a ProjectVersion,
    changes: &'a PendingFiles,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    transaction: String,
}

#[derive(Debug, Deserialize)]
struct PushFinishResponse {
    version: ProjectVersion,
}

// ============================================================================
// RemoteClient
// ============================================================================

/// HTTP client for the hosted project server
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Obtain an authenticated instance through [`RemoteClient::login`].
#[derive(Debug)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RemoteClient {
    /// Log in and return an authenticated client
    ///
    /// Both authentication failures and transport problems (DNS, refused
    /// connections) surface as errors here, before any sync work starts.
    pub async fn login(base_url: impl Into<String>, username: &str, password: &str) -> Result<Self> {
        let base_url = trim_base_url(base_url.into());
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        debug!(%base_url, username, "Logging in to project server");
        let response = client
            .post(format!("{base_url}/v1/auth/login"))
            .json(&LoginRequest {
                login: username,
                password,
            })
            .send()
            .await
            .context("Unable to reach the project server")?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            bail!(
                "Unable to log in to the project server \
                 (have you specified correct credentials in the configuration file?)"
            );
        }
        let login: LoginResponse = response
            .error_for_status()
            .context("Login request failed")?
            .json()
            .await
            .context("Failed to parse login response")?;

        info!(username, "Logged in to project server");
        Ok(Self {
            client,
            base_url,
            token: login.token,
        })
    }

    /// Creates an authenticated client with a known token (useful for testing)
    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_base_url(base_url.into()),
            token: token.into(),
        }
    }

    /// Creates an authenticated request builder for the given method and path
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(&self.token)
    }

    /// Fetch project version and file list
    ///
    /// `at` pins the listing to a specific version (defaults to latest);
    /// `since` asks the server to include history relative to a known
    /// version, which does not affect the reported version.
    pub async fn project_info(
        &self,
        project: &ProjectPath,
        at: Option<&ProjectVersion>,
        since: Option<&ProjectVersion>,
    ) -> Result<ProjectInfo> {
        let path = format!(
            "/v1/project/{}/{}",
            project.namespace(),
            project.short_name()
        );
        let mut request = self.request(Method::GET, &path);
        if let Some(version) = at {
            request = request.query(&[("version", version.as_str())]);
        }
        if let Some(version) = since {
            request = request.query(&[("since", version.as_str())]);
        }

        let info: ProjectResponse = request
            .send()
            .await
            .context("Unable to reach the project server")?
            .error_for_status()
            .with_context(|| format!("Project info request failed for {project}"))?
            .json()
            .await
            .context("Failed to parse project info response")?;

        Ok(ProjectInfo {
            version: info.version,
            files: info.files,
        })
    }

    /// Download one file's content at a project version
    pub async fn download_file(
        &self,
        project: &ProjectPath,
        file: &str,
        version: &ProjectVersion,
    ) -> Result<Vec<u8>> {
        debug!(%project, file, %version, "Downloading file");
        let path = format!(
            "/v1/project/raw/{}/{}",
            project.namespace(),
            project.short_name()
        );
        let response = self
            .request(Method::GET, &path)
            .query(&[("file", file), ("version", version.as_str())])
            .send()
            .await
            .context("Unable to reach the project server")?
            .error_for_status()
            .with_context(|| format!("Download failed for {file}"))?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Open a push transaction against the server
    ///
    /// The server rejects the push when `local_version` is no longer its
    /// current version.
    pub async fn push_start(
        &self,
        project: &ProjectPath,
        local_version: &ProjectVersion,
        changes: &PendingFiles,
    ) -> Result<String> {
        let path = format!(
            "/v1/project/push/{}/{}",
            project.namespace(),
            project.short_name()
        );
        let response: PushResponse = self
            .request(Method::POST, &path)
            .json(&PushRequest {
                version: local_version,
                changes,
            })
            .send()
            .await
            .context("Unable to reach the project server")?
            .error_for_status()
            .with_context(|| format!("Push rejected for {project}"))?
            .json()
            .await
            .context("Failed to parse push response")?;

        Ok(response.transaction)
    }

    /// Upload one file's content within a push transaction
    pub async fn push_file(&self, transaction: &str, change: &FileChange, content: Vec<u8>) -> Result<()> {
        debug!(transaction, file = %change.path, size = content.len(), "Uploading file");
        self.request(Method::POST, &format!("/v1/project/push/chunk/{transaction}"))
            .query(&[("file", change.path.as_str())])
            .body(content)
            .send()
            .await
            .context("Unable to reach the project server")?
            .error_for_status()
            .with_context(|| format!("Upload failed for {}", change.path))?;
        Ok(())
    }

    /// Commit a push transaction; returns the new server version
    pub async fn push_finish(&self, transaction: &str) -> Result<ProjectVersion> {
        let response: PushFinishResponse = self
            .request(Method::POST, &format!("/v1/project/push/finish/{transaction}"))
            .send()
            .await
            .context("Unable to reach the project server")?
            .error_for_status()
            .context("Push commit failed")?
            .json()
            .await
            .context("Failed to parse push commit response")?;

        info!(transaction, version = %response.version, "Push committed");
        Ok(response.version)
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

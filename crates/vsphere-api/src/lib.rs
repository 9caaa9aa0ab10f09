//! Typed Rust model of the vSphere objects used to clone and customize VMs,
//! plus a client for the datastore HTTP file-access endpoint.
//!
//! The SOAP inventory surface (finder, clone, tasks) is not implemented here;
//! this crate only provides the data types exchanged with it.

mod device;
mod types;

use std::path::Path;

pub use device::{DeviceError, DeviceList};
pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vsphere request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vsphere {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{kind} {name} was not found")]
    NotFound { kind: &'static str, name: String },

    #[error("vsphere fault: {0}")]
    Fault(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the `/folder` datastore file-access endpoint of a vCenter
/// or ESXi host.
#[derive(Clone)]
pub struct DatastoreClient {
    base_url: String,
    datacenter: String,
    datastore: String,
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl DatastoreClient {
    pub fn new(
        base_url: impl Into<String>,
        datacenter: impl Into<String>,
        datastore: impl Into<String>,
    ) -> Self {
        Self::with_http(base_url, datacenter, datastore, reqwest::Client::new())
    }

    /// Like `new` but skips TLS certificate verification.
    pub fn insecure(
        base_url: impl Into<String>,
        datacenter: impl Into<String>,
        datastore: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self::with_http(base_url, datacenter, datastore, http))
    }

    fn with_http(
        base_url: impl Into<String>,
        datacenter: impl Into<String>,
        datastore: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            datacenter: datacenter.into(),
            datastore: datastore.into(),
            credentials: None,
            http,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn datastore(&self) -> &str {
        &self.datastore
    }

    /// Full datastore path for a file relative to the datastore root.
    pub fn path(&self, relative: &str) -> DatastorePath {
        DatastorePath {
            datastore: self.datastore.clone(),
            path: relative.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, relative: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/folder/{}",
            self.base_url,
            relative.trim_start_matches('/')
        );
        let req = self.http.request(method, url).query(&[
            ("dcPath", self.datacenter.as_str()),
            ("dsName", self.datastore.as_str()),
        ]);
        match &self.credentials {
            Some((user, pass)) => req.basic_auth(user, Some(pass)),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(resp)
    }

    // ── Files ────────────────────────────────────────────────────────

    pub async fn upload_file(&self, local: &Path, relative: &str) -> Result<()> {
        let body = tokio::fs::read(local).await?;
        let resp = self
            .request(reqwest::Method::PUT, relative)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        Self::check(resp, "upload file").await?;
        Ok(())
    }

    /// Delete a file. A 404 is reported as [`Error::NotFound`] so callers can
    /// decide whether an absent file is acceptable.
    pub async fn delete_file(&self, relative: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, relative)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found("file", self.path(relative).to_string()));
        }
        Self::check(resp, "delete file").await?;
        Ok(())
    }
}

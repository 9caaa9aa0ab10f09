use std::collections::BTreeSet;
use std::env;

use serde::Deserialize;

use crate::{Error, Result};

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{name} must be set")))
}

fn parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        _ => Ok(None),
    }
}

/// Where to reach vCenter and which datacenter/datastore to work in.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub datacenter: String,
    pub datastore: String,
    #[serde(default)]
    pub allow_insecure: bool,
}

impl ConnectionConfig {
    /// Create from env vars:
    ///
    /// - `VSPHERE_URL`, `VSPHERE_USERNAME`, `VSPHERE_PASSWORD` (required)
    /// - `VSPHERE_DATACENTER` (required)
    /// - `VSPHERE_DATASTORE` (required)
    /// - `VSPHERE_ALLOW_INSECURE` (default: `false`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            url: required("VSPHERE_URL")?,
            username: required("VSPHERE_USERNAME")?,
            password: required("VSPHERE_PASSWORD")?,
            datacenter: required("VSPHERE_DATACENTER")?,
            datastore: required("VSPHERE_DATASTORE")?,
            allow_insecure: parsed("VSPHERE_ALLOW_INSECURE")?.unwrap_or(false),
        })
    }

    pub fn datastore_client(&self) -> Result<vsphere_api::DatastoreClient> {
        let client = if self.allow_insecure {
            vsphere_api::DatastoreClient::insecure(&self.url, &self.datacenter, &self.datastore)
                .map_err(|e| Error::Config(format!("building http client: {e}")))?
        } else {
            vsphere_api::DatastoreClient::new(&self.url, &self.datacenter, &self.datastore)
        };
        Ok(client.with_credentials(&self.username, &self.password))
    }
}

/// Per-machine clone parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionConfig {
    pub template_vm_name: String,
    pub folder: String,
    pub cpus: i32,
    pub memory_mb: i64,
    #[serde(default)]
    pub disk_size_gb: Option<i64>,
    #[serde(default)]
    pub vm_net_name: Option<String>,
    #[serde(default)]
    pub networks: Vec<String>,
}

impl ProvisionConfig {
    /// Create from env vars:
    ///
    /// - `VSPHERE_TEMPLATE_VM`, `VSPHERE_FOLDER` (required)
    /// - `VSPHERE_CPUS` (default: `2`), `VSPHERE_MEMORY_MB` (default: `2048`)
    /// - `VSPHERE_DISK_SIZE_GB` (optional)
    /// - `VSPHERE_VM_NET_NAME` (optional)
    /// - `VSPHERE_NETWORKS` (comma-separated names, optional)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let networks = env::var("VSPHERE_NETWORKS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            template_vm_name: required("VSPHERE_TEMPLATE_VM")?,
            folder: required("VSPHERE_FOLDER")?,
            cpus: parsed("VSPHERE_CPUS")?.unwrap_or(2),
            memory_mb: parsed("VSPHERE_MEMORY_MB")?.unwrap_or(2048),
            disk_size_gb: parsed("VSPHERE_DISK_SIZE_GB")?,
            vm_net_name: env::var("VSPHERE_VM_NET_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            networks,
        })
    }

    /// The named network and the extra networks, de-duplicated and sorted.
    pub fn network_names(&self) -> Vec<String> {
        self.networks
            .iter()
            .chain(self.vm_net_name.iter())
            .filter(|name| !name.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub mod cidata;
pub mod clone;
pub mod config;
pub mod devices;
pub mod guestinfo;
pub mod metadata;
pub mod network;
pub mod report;
pub mod session;
pub mod transport;

#[cfg(test)]
mod fake;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use clone::{CloneStage, Provisioner};
pub use config::{ConnectionConfig, ProvisionConfig};
pub use session::{Datastore, Inventory, Session};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get template vm {name}: {source}")]
    TemplateNotFound {
        name: String,
        source: vsphere_api::Error,
    },

    #[error("failed to get vm folder {path}: {source}")]
    FolderNotFound {
        path: String,
        source: vsphere_api::Error,
    },

    #[error("failed to get datastore {name}: {source}")]
    DatastoreNotFound {
        name: String,
        source: vsphere_api::Error,
    },

    #[error("failed to list devices of template vm {template}: {source}")]
    DeviceEnumerationFailure {
        template: String,
        source: vsphere_api::Error,
    },

    #[error("failed to build device specification for {vm}: {source}")]
    Device {
        vm: String,
        source: vsphere_api::DeviceError,
    },

    #[error("failed to read properties of vm {vm}: {source}")]
    PropertyRead {
        vm: String,
        source: vsphere_api::Error,
    },

    #[error("system is missing genisoimage or mkisofs, can't generate userdata iso for {vm}")]
    ToolingUnavailable { vm: String },

    #[error("failed to locally write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to run `{command}`: {source}")]
    ToolSpawn {
        command: String,
        source: std::io::Error,
    },

    #[error("error executing command `{command}`: {status}, output: `{output}`")]
    ToolExecutionFailure {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("failed to upload userdata iso to {path}: {source}")]
    UploadFailure {
        path: String,
        source: vsphere_api::Error,
    },

    #[error("template {template} has no vApp config; make sure the correct OVA was imported")]
    MissingGuestSchema { template: String },

    #[error("template {template} is missing required vApp properties {missing:?}")]
    IncompleteTemplate {
        template: String,
        missing: Vec<&'static str>,
    },

    #[error("template must have exactly one disk to resize, found {found}")]
    InvalidDiskCount { found: usize },

    #[error("invalid disk size {size_gb} GB")]
    InvalidDiskSize { size_gb: i64 },

    #[error("failed to get network {name}: {source}")]
    NetworkNotFound {
        name: String,
        source: vsphere_api::Error,
    },

    #[error("failed to clone template vm to {vm}: {source}")]
    CloneSubmitFailure {
        vm: String,
        source: vsphere_api::Error,
    },

    #[error("error when waiting for result of clone task for {vm}: {source}")]
    CloneTaskFailure {
        vm: String,
        source: vsphere_api::Error,
    },

    #[error("clone of {vm} was cancelled")]
    Cancelled { vm: String },

    #[error("failed to get virtual machine {vm} after cloning: {source}")]
    PostCloneLookupFailure {
        vm: String,
        source: vsphere_api::Error,
    },

    #[error("failed to delete userdata iso of machine {vm}: {source}")]
    DeleteFailure {
        vm: String,
        source: vsphere_api::Error,
    },

    #[error("error cleaning up {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Guest operating systems a template can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestOs {
    Coreos,
    Ubuntu,
    Centos,
}

/// How userdata reaches the guest on first boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserdataInjection {
    /// Base64 userdata written into the template's vApp properties.
    GuestInfo,
    /// A cloud-init NoCloud ISO attached as a cdrom.
    CdRom,
}

impl GuestOs {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coreos => "coreos",
            Self::Ubuntu => "ubuntu",
            Self::Centos => "centos",
        }
    }

    pub fn injection(&self) -> UserdataInjection {
        match self {
            Self::Coreos => UserdataInjection::GuestInfo,
            Self::Ubuntu | Self::Centos => UserdataInjection::CdRom,
        }
    }
}

impl fmt::Display for GuestOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuestOs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coreos" => Ok(Self::Coreos),
            "ubuntu" => Ok(Self::Ubuntu),
            "centos" => Ok(Self::Centos),
            other => Err(Error::Config(format!("unknown guest os: {other}"))),
        }
    }
}

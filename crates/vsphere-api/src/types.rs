use serde::{Deserialize, Serialize};
use std::fmt;

// ── Managed objects ──────────────────────────────────────────────────

/// Server-side handle to a managed object (e.g. `VirtualMachine:vm-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualMachine {
    pub reference: ManagedObjectReference,
    pub name: String,
    pub inventory_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub reference: ManagedObjectReference,
    pub inventory_path: String,
}

/// Handle to an asynchronous server-side task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub reference: ManagedObjectReference,
}

/// A file location on a datastore, rendered as `[datastore] path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatastorePath {
    pub datastore: String,
    pub path: String,
}

impl fmt::Display for DatastorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.datastore, self.path)
    }
}

// ── Devices ──────────────────────────────────────────────────────────

/// Device class used to select devices out of a [`crate::DeviceList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Floppy,
    Cdrom,
    IdeController,
    Disk,
    EthernetCard,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDevice {
    pub key: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_key: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<i32>,
    pub kind: DeviceKind,
}

impl VirtualDevice {
    pub fn class(&self) -> DeviceClass {
        self.kind.class()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    Floppy,
    Cdrom {
        #[serde(skip_serializing_if = "Option::is_none")]
        backing: Option<CdromBacking>,
    },
    #[serde(rename_all = "camelCase")]
    IdeController { bus_number: i32 },
    #[serde(rename_all = "camelCase")]
    Disk { capacity_in_kb: i64 },
    #[serde(rename_all = "camelCase")]
    EthernetCard {
        adapter: EthernetAdapter,
        backing: NetworkBacking,
        address_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Other { type_name: String },
}

impl DeviceKind {
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Floppy => DeviceClass::Floppy,
            Self::Cdrom { .. } => DeviceClass::Cdrom,
            Self::IdeController { .. } => DeviceClass::IdeController,
            Self::Disk { .. } => DeviceClass::Disk,
            Self::EthernetCard { .. } => DeviceClass::EthernetCard,
            Self::Other { .. } => DeviceClass::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CdromBacking {
    /// ISO image file on a datastore.
    Iso { file_name: DatastorePath },
    /// Client-side device passthrough, the usual state of a template drive.
    #[serde(rename_all = "camelCase")]
    RemotePassthrough { device_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EthernetAdapter {
    Vmxnet3,
    E1000,
    E1000e,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkBacking {
    #[serde(rename_all = "camelCase")]
    Network { device_name: String },
    #[serde(rename_all = "camelCase")]
    DistributedPortgroup {
        switch_uuid: String,
        portgroup_key: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOperation {
    Add,
    Remove,
    Edit,
}

/// One entry of a VM config spec's `deviceChange` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceChange {
    pub operation: DeviceOperation,
    pub device: VirtualDevice,
}

impl DeviceChange {
    pub fn add(device: VirtualDevice) -> Self {
        Self {
            operation: DeviceOperation::Add,
            device,
        }
    }

    pub fn remove(device: VirtualDevice) -> Self {
        Self {
            operation: DeviceOperation::Remove,
            device,
        }
    }

    pub fn edit(device: VirtualDevice) -> Self {
        Self {
            operation: DeviceOperation::Edit,
            device,
        }
    }
}

// ── vApp properties ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VAppProperty {
    pub key: i32,
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// Guest-customization schema exposed by a VM's `config.vAppConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VAppConfig {
    #[serde(default)]
    pub property: Vec<VAppProperty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrayUpdateOperation {
    Add,
    Remove,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VAppPropertyChange {
    pub operation: ArrayUpdateOperation,
    pub info: VAppProperty,
}

// ── Custom fields ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub key: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomFieldValue {
    String { key: i32, value: String },
    Other { key: i32 },
}

impl CustomFieldValue {
    pub fn key(&self) -> i32 {
        match self {
            Self::String { key, .. } | Self::Other { key } => *key,
        }
    }
}

/// `availableField` and `value` of a managed entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFields {
    pub available_field: Vec<CustomFieldDef>,
    pub value: Vec<CustomFieldValue>,
}

// ── Clone spec ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiskMoveType {
    MoveAllDiskBackingsAndAllowSharing,
    MoveAllDiskBackingsAndDisallowSharing,
    MoveAllDiskBackingsAndConsolidate,
    MoveChildMostDiskBacking,
    CreateNewChildDiskBacking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateSpec {
    pub datastore: ManagedObjectReference,
    pub disk_move_type: DiskMoveType,
    pub folder: ManagedObjectReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_uuid_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmConfigSpec {
    pub property: Vec<VAppPropertyChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    #[serde(rename = "numCPUs")]
    pub num_cpus: i32,
    #[serde(rename = "memoryMB")]
    pub memory_mb: i64,
    pub device_change: Vec<DeviceChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_app_config: Option<VmConfigSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<VmFlags>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSpec {
    pub location: RelocateSpec,
    pub config: ConfigSpec,
    pub power_on: bool,
    pub template: bool,
}

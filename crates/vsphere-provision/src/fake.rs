//! In-memory stand-ins for a vCenter session.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use vsphere_api::{
    CloneSpec, CustomFields, DeviceKind, DeviceList, EthernetAdapter, Folder,
    ManagedObjectReference, NetworkBacking, Task, VAppConfig, VirtualDevice, VirtualMachine,
};

use crate::session::{Datastore, Inventory};

pub(crate) fn nic(key: i32, network: &str) -> VirtualDevice {
    VirtualDevice {
        key,
        controller_key: None,
        unit_number: None,
        kind: DeviceKind::EthernetCard {
            adapter: EthernetAdapter::E1000,
            backing: NetworkBacking::Network {
                device_name: network.into(),
            },
            address_type: "generated".into(),
        },
    }
}

/// Write an executable shell script named `name` into `dir`.
///
/// `action` runs with `$out` set to the value after `-o` and `$dir` set to the
/// last argument.
#[cfg(unix)]
pub(crate) fn install_iso_tool(dir: &Path, name: &str, action: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\nout=\"\"\nprev=\"\"\nfor arg in \"$@\"; do\n  if [ \"$prev\" = \"-o\" ]; then out=\"$arg\"; fi\n  prev=\"$arg\"\n  dir=\"$arg\"\ndone\n{action}\n"
    );
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

struct FakeVm {
    vm: VirtualMachine,
    devices: DeviceList,
    vapp: Option<VAppConfig>,
    fields: CustomFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    Succeed,
    Fail,
    Hang,
    /// The task succeeds but the new VM never shows up in the inventory.
    Vanish,
}

pub(crate) struct FakeInventory {
    vms: Mutex<HashMap<String, FakeVm>>,
    folders: HashMap<String, Folder>,
    networks: HashMap<String, NetworkBacking>,
    outcome: TaskOutcome,
    pub clones: Mutex<Vec<(String, CloneSpec)>>,
}

impl FakeInventory {
    pub fn new() -> Self {
        let mut folders = HashMap::new();
        folders.insert(
            "/dc1/vm".to_string(),
            Folder {
                reference: ManagedObjectReference::new("Folder", "group-v3"),
                inventory_path: "/dc1/vm".into(),
            },
        );

        Self {
            vms: Mutex::new(HashMap::new()),
            folders,
            networks: HashMap::new(),
            outcome: TaskOutcome::Succeed,
            clones: Mutex::new(Vec::new()),
        }
    }

    pub fn with_template(self, name: &str, devices: Vec<VirtualDevice>) -> Self {
        self.with_vm(name, devices, None, CustomFields::default())
    }

    pub fn with_vm(
        self,
        name: &str,
        devices: Vec<VirtualDevice>,
        vapp: Option<VAppConfig>,
        fields: CustomFields,
    ) -> Self {
        let index = self.vms.lock().unwrap().len();
        let vm = VirtualMachine {
            reference: ManagedObjectReference::new("VirtualMachine", format!("vm-{}", 100 + index)),
            name: name.into(),
            inventory_path: format!("/dc1/vm/{name}"),
        };
        self.vms.lock().unwrap().insert(
            name.into(),
            FakeVm {
                vm,
                devices: DeviceList::new(devices),
                vapp,
                fields,
            },
        );
        self
    }

    pub fn with_network(mut self, name: &str) -> Self {
        self.networks.insert(
            name.into(),
            NetworkBacking::Network {
                device_name: name.into(),
            },
        );
        self
    }

    pub fn with_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn clone_count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }

    fn vm(&self, name: &str) -> vsphere_api::Result<VirtualMachine> {
        self.vms
            .lock()
            .unwrap()
            .get(name)
            .map(|v| v.vm.clone())
            .ok_or_else(|| vsphere_api::Error::not_found("vm", name))
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn find_vm(&self, name: &str) -> vsphere_api::Result<VirtualMachine> {
        self.vm(name)
    }

    async fn find_folder(&self, path: &str) -> vsphere_api::Result<Folder> {
        self.folders
            .get(path)
            .cloned()
            .ok_or_else(|| vsphere_api::Error::not_found("folder", path))
    }

    async fn find_datastore(&self, name: &str) -> vsphere_api::Result<ManagedObjectReference> {
        Ok(ManagedObjectReference::new("Datastore", format!("datastore-{name}")))
    }

    async fn devices(&self, vm: &VirtualMachine) -> vsphere_api::Result<DeviceList> {
        self.vms
            .lock()
            .unwrap()
            .get(&vm.name)
            .map(|v| v.devices.clone())
            .ok_or_else(|| vsphere_api::Error::not_found("vm", vm.name.clone()))
    }

    async fn vapp_config(&self, vm: &VirtualMachine) -> vsphere_api::Result<Option<VAppConfig>> {
        self.vms
            .lock()
            .unwrap()
            .get(&vm.name)
            .map(|v| v.vapp.clone())
            .ok_or_else(|| vsphere_api::Error::not_found("vm", vm.name.clone()))
    }

    async fn custom_fields(&self, vm: &VirtualMachine) -> vsphere_api::Result<CustomFields> {
        self.vms
            .lock()
            .unwrap()
            .get(&vm.name)
            .map(|v| v.fields.clone())
            .ok_or_else(|| vsphere_api::Error::not_found("vm", vm.name.clone()))
    }

    async fn network_backing(&self, name: &str) -> vsphere_api::Result<NetworkBacking> {
        self.networks
            .get(name)
            .cloned()
            .ok_or_else(|| vsphere_api::Error::not_found("network", name))
    }

    async fn clone_vm(
        &self,
        _template: &VirtualMachine,
        _folder: &Folder,
        name: &str,
        spec: &CloneSpec,
    ) -> vsphere_api::Result<Task> {
        let mut clones = self.clones.lock().unwrap();
        clones.push((name.to_string(), spec.clone()));
        Ok(Task {
            reference: ManagedObjectReference::new("Task", format!("task-{}", clones.len())),
        })
    }

    async fn wait_for_task(&self, _task: &Task) -> vsphere_api::Result<()> {
        match self.outcome {
            TaskOutcome::Succeed => {
                let clones = self.clones.lock().unwrap().clone();
                for (name, spec) in clones {
                    let devices = spec.config.device_change.into_iter().map(|c| c.device);
                    let mut vms = self.vms.lock().unwrap();
                    if !vms.contains_key(&name) {
                        let vm = VirtualMachine {
                            reference: ManagedObjectReference::new(
                                "VirtualMachine",
                                format!("vm-{}", 100 + vms.len()),
                            ),
                            name: name.clone(),
                            inventory_path: format!("/dc1/vm/{name}"),
                        };
                        vms.insert(
                            name,
                            FakeVm {
                                vm,
                                devices: DeviceList::new(devices.collect()),
                                vapp: None,
                                fields: CustomFields::default(),
                            },
                        );
                    }
                }
                Ok(())
            }
            TaskOutcome::Vanish => Ok(()),
            TaskOutcome::Fail => Err(vsphere_api::Error::Fault(
                "Insufficient resources to satisfy configured failover level".into(),
            )),
            TaskOutcome::Hang => std::future::pending().await,
        }
    }
}

/// Datastore keeping uploaded files in memory.
pub(crate) struct FakeDatastore {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: bool,
}

impl FakeDatastore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            fail_writes: false,
        }
    }

    /// Every upload and delete fails with a server error.
    pub fn failing() -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            fail_writes: true,
        }
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    fn fault(&self) -> vsphere_api::Error {
        vsphere_api::Error::Fault("Cannot complete file operation".into())
    }
}

#[async_trait]
impl Datastore for FakeDatastore {
    fn name(&self) -> &str {
        "datastore1"
    }

    async fn upload_file(&self, local: &Path, relative: &str) -> vsphere_api::Result<()> {
        if self.fail_writes {
            return Err(self.fault());
        }
        let contents = tokio::fs::read(local).await?;
        self.files
            .lock()
            .unwrap()
            .insert(relative.to_string(), contents);
        Ok(())
    }

    async fn delete_file(&self, relative: &str) -> vsphere_api::Result<()> {
        if self.fail_writes {
            return Err(self.fault());
        }
        match self.files.lock().unwrap().remove(relative) {
            Some(_) => Ok(()),
            None => Err(vsphere_api::Error::not_found(
                "file",
                self.path(relative).to_string(),
            )),
        }
    }
}

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use vsphere_api::{
    CloneSpec, CustomFields, DatastoreClient, DatastorePath, DeviceList, Folder,
    ManagedObjectReference, NetworkBacking, Task, VAppConfig, VirtualMachine,
};

/// Inventory and task operations of a connected vCenter session.
///
/// Lookups that find nothing must return [`vsphere_api::Error::NotFound`].
#[async_trait]
pub trait Inventory: Send + Sync + 'static {
    async fn find_vm(&self, name: &str) -> vsphere_api::Result<VirtualMachine>;

    async fn find_folder(&self, path: &str) -> vsphere_api::Result<Folder>;

    async fn find_datastore(&self, name: &str) -> vsphere_api::Result<ManagedObjectReference>;

    /// Current hardware of a VM.
    async fn devices(&self, vm: &VirtualMachine) -> vsphere_api::Result<DeviceList>;

    /// `config.vAppConfig`, or `None` when the VM has no vApp options.
    async fn vapp_config(&self, vm: &VirtualMachine) -> vsphere_api::Result<Option<VAppConfig>>;

    async fn custom_fields(&self, vm: &VirtualMachine) -> vsphere_api::Result<CustomFields>;

    /// Ethernet card backing for the network with the given inventory name.
    async fn network_backing(&self, name: &str) -> vsphere_api::Result<NetworkBacking>;

    /// Submit a clone of `template`. Returns as soon as the task is created.
    async fn clone_vm(
        &self,
        template: &VirtualMachine,
        folder: &Folder,
        name: &str,
        spec: &CloneSpec,
    ) -> vsphere_api::Result<Task>;

    /// Block until `task` finishes; task errors come back as `Fault`.
    async fn wait_for_task(&self, task: &Task) -> vsphere_api::Result<()>;
}

/// File access on the datastore new VMs are placed on.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn upload_file(&self, local: &Path, relative: &str) -> vsphere_api::Result<()>;

    /// Delete a file; a missing file yields [`vsphere_api::Error::NotFound`].
    async fn delete_file(&self, relative: &str) -> vsphere_api::Result<()>;

    fn path(&self, relative: &str) -> DatastorePath {
        DatastorePath {
            datastore: self.name().to_string(),
            path: relative.to_string(),
        }
    }
}

#[async_trait]
impl Datastore for DatastoreClient {
    fn name(&self) -> &str {
        self.datastore()
    }

    async fn upload_file(&self, local: &Path, relative: &str) -> vsphere_api::Result<()> {
        DatastoreClient::upload_file(self, local, relative).await
    }

    async fn delete_file(&self, relative: &str) -> vsphere_api::Result<()> {
        DatastoreClient::delete_file(self, relative).await
    }
}

/// A vCenter connection scoped to one datacenter and datastore.
#[derive(Clone)]
pub struct Session {
    pub inventory: Arc<dyn Inventory>,
    pub datastore: Arc<dyn Datastore>,
}

impl Session {
    pub fn new(inventory: Arc<dyn Inventory>, datastore: Arc<dyn Datastore>) -> Self {
        Self {
            inventory,
            datastore,
        }
    }
}

//! Cloning a template into a new machine with its userdata attached.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vsphere_api::{
    CloneSpec, ConfigSpec, DeviceChange, DiskMoveType, RelocateSpec, VAppPropertyChange,
    VirtualMachine, VmConfigSpec, VmFlags,
};

use crate::cidata::ImageBuilder;
use crate::config::ProvisionConfig;
use crate::devices::{cdrom_specs, disk_resize_spec, remove_floppy_devices, with_added};
use crate::guestinfo::coreos_properties;
use crate::network::network_specs;
use crate::session::Session;
use crate::transport::UserdataTransport;
use crate::{Error, GuestOs, Result, UserdataInjection};

/// Progress of a single clone attempt, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStage {
    Resolving,
    DeviceListing,
    InjectionPrepared,
    SpecAssembled,
    Cloning,
    Completed,
}

/// Creates machines by cloning a template VM.
///
/// Calls for different machine names may run concurrently; the caller must
/// not run two calls for the same name at once.
pub struct Provisioner {
    session: Session,
    images: ImageBuilder,
    transport: UserdataTransport,
}

impl Provisioner {
    pub fn new(session: Session, images: ImageBuilder) -> Self {
        let transport = UserdataTransport::new(session.datastore.clone());
        Self {
            session,
            images,
            transport,
        }
    }

    /// Clone `config.template_vm_name` into a machine called `name` and return
    /// the new VM.
    ///
    /// Cancelling `cancel` while the clone task runs stops the wait with
    /// [`Error::Cancelled`]; the server-side task keeps going. Nothing is
    /// rolled back on failure: an uploaded ISO is left for
    /// [`Provisioner::remove_userdata`] to clean up on teardown.
    pub async fn create_cloned_vm(
        &self,
        name: &str,
        config: &ProvisionConfig,
        guest_os: GuestOs,
        userdata: &str,
        cancel: &CancellationToken,
    ) -> Result<VirtualMachine> {
        let inventory = &*self.session.inventory;
        let enter = |stage: CloneStage| debug!(vm = name, ?stage, "clone stage");

        enter(CloneStage::Resolving);
        let template = inventory
            .find_vm(&config.template_vm_name)
            .await
            .map_err(|source| Error::TemplateNotFound {
                name: config.template_vm_name.clone(),
                source,
            })?;
        let folder = inventory
            .find_folder(&config.folder)
            .await
            .map_err(|source| Error::FolderNotFound {
                path: config.folder.clone(),
                source,
            })?;
        let datastore_name = self.session.datastore.name();
        let datastore = inventory
            .find_datastore(datastore_name)
            .await
            .map_err(|source| Error::DatastoreNotFound {
                name: datastore_name.to_string(),
                source,
            })?;
        let target_path = format!(
            "{}/{}",
            folder.inventory_path.trim_end_matches('/'),
            name
        );

        enter(CloneStage::DeviceListing);
        let devices =
            inventory
                .devices(&template)
                .await
                .map_err(|source| Error::DeviceEnumerationFailure {
                    template: template.name.clone(),
                    source,
                })?;

        let mut device_changes: Vec<DeviceChange> = remove_floppy_devices(&devices);
        let mut property_changes: Vec<VAppPropertyChange> = Vec::new();

        match guest_os.injection() {
            UserdataInjection::GuestInfo => {
                property_changes.extend(coreos_properties(inventory, &template, userdata).await?);
            }
            UserdataInjection::CdRom => {
                let image = self.images.build(userdata, name).await?;
                let iso = self.transport.upload(image.path(), name).await?;
                drop(image);

                device_changes.extend(cdrom_specs(&devices, &iso).map_err(|source| {
                    Error::Device {
                        vm: name.to_string(),
                        source,
                    }
                })?);
            }
        }
        enter(CloneStage::InjectionPrepared);

        if let Some(size_gb) = config.disk_size_gb {
            device_changes.push(disk_resize_spec(&devices, size_gb)?);
        }

        let networks = config.network_names();
        if !networks.is_empty() {
            let pending = with_added(&devices, &device_changes);
            device_changes.extend(network_specs(inventory, name, &pending, &networks).await?);
        }

        let spec = CloneSpec {
            location: RelocateSpec {
                datastore,
                disk_move_type: DiskMoveType::MoveAllDiskBackingsAndConsolidate,
                folder: folder.reference.clone(),
            },
            config: ConfigSpec {
                num_cpus: config.cpus,
                memory_mb: config.memory_mb,
                device_change: device_changes,
                v_app_config: Some(VmConfigSpec {
                    property: property_changes,
                }),
                flags: Some(VmFlags {
                    disk_uuid_enabled: Some(true),
                }),
            },
            power_on: false,
            template: false,
        };
        enter(CloneStage::SpecAssembled);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                vm: name.to_string(),
            });
        }

        enter(CloneStage::Cloning);
        info!(
            template = %template.inventory_path,
            target = %target_path,
            guest_os = %guest_os,
            "cloning template vm"
        );
        let task = inventory
            .clone_vm(&template, &folder, name, &spec)
            .await
            .map_err(|source| Error::CloneSubmitFailure {
                vm: name.to_string(),
                source,
            })?;

        tokio::select! {
            res = inventory.wait_for_task(&task) => {
                res.map_err(|source| Error::CloneTaskFailure {
                    vm: name.to_string(),
                    source,
                })?;
            }
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled {
                    vm: name.to_string(),
                });
            }
        }
        info!(
            template = %template.inventory_path,
            target = %target_path,
            "cloned template vm"
        );

        let vm = inventory
            .find_vm(name)
            .await
            .map_err(|source| Error::PostCloneLookupFailure {
                vm: name.to_string(),
                source,
            })?;

        enter(CloneStage::Completed);
        Ok(vm)
    }

    /// Delete the userdata ISO uploaded for `name`, if any.
    pub async fn remove_userdata(&self, name: &str) -> Result<()> {
        self.transport.remove(name).await
    }
}

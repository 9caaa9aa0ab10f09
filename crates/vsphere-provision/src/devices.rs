//! Device-change builders. Each takes the template's device list by
//! reference and returns the operations to append to the clone spec; none of
//! them modify the list they are given.

use vsphere_api::{
    CdromBacking, DatastorePath, DeviceChange, DeviceClass, DeviceError, DeviceKind, DeviceList,
    DeviceOperation, VirtualDevice,
};

use crate::{Error, Result};

const KB_PER_GB: i64 = 1024 * 1024;

/// One `Remove` per device of the given class.
pub fn remove_devices_of_class(devices: &DeviceList, class: DeviceClass) -> Vec<DeviceChange> {
    devices
        .select_by_class(class)
        .cloned()
        .map(DeviceChange::remove)
        .collect()
}

/// Ubuntu cloud images try to write to an attached floppy drive on boot and
/// fail when it holds no disk, so clones never keep one.
pub fn remove_floppy_devices(devices: &DeviceList) -> Vec<DeviceChange> {
    remove_devices_of_class(devices, DeviceClass::Floppy)
}

/// Replace every cdrom drive and IDE controller with a fresh controller and a
/// single drive backed by `iso`.
///
/// The template's controllers are never reused so the new drive always sits
/// on a controller with a known key.
pub fn cdrom_specs(
    devices: &DeviceList,
    iso: &DatastorePath,
) -> std::result::Result<Vec<DeviceChange>, DeviceError> {
    let mut specs = remove_devices_of_class(devices, DeviceClass::Cdrom);
    specs.extend(remove_devices_of_class(devices, DeviceClass::IdeController));

    // Keys are allocated against a scratch copy so the drive doesn't get the
    // controller's key.
    let mut pending = devices.clone();

    let controller = VirtualDevice {
        key: pending.new_key()?,
        controller_key: None,
        unit_number: None,
        kind: DeviceKind::IdeController { bus_number: 0 },
    };
    pending.push(controller.clone());

    let mut cdrom = pending.create_cdrom(&controller)?;
    cdrom.kind = DeviceKind::Cdrom {
        backing: Some(CdromBacking::Iso {
            file_name: iso.clone(),
        }),
    };

    specs.push(DeviceChange::add(controller));
    specs.push(DeviceChange::add(cdrom));
    Ok(specs)
}

/// `devices` plus every device that `changes` adds.
///
/// A builder running after another one allocates keys against this list, so
/// the devices it adds never reuse a key already handed out.
pub fn with_added(devices: &DeviceList, changes: &[DeviceChange]) -> DeviceList {
    let mut pending = devices.clone();
    for change in changes {
        if change.operation == DeviceOperation::Add {
            pending.push(change.device.clone());
        }
    }
    pending
}

/// Grow the template's only disk to `size_gb`.
pub fn disk_resize_spec(devices: &DeviceList, size_gb: i64) -> Result<DeviceChange> {
    let capacity_in_kb = size_gb
        .checked_mul(KB_PER_GB)
        .filter(|_| size_gb > 0)
        .ok_or(Error::InvalidDiskSize { size_gb })?;

    let disks: Vec<&VirtualDevice> = devices.select_by_class(DeviceClass::Disk).collect();
    let [disk] = disks.as_slice() else {
        return Err(Error::InvalidDiskCount { found: disks.len() });
    };

    let mut disk = (*disk).clone();
    disk.kind = DeviceKind::Disk { capacity_in_kb };
    Ok(DeviceChange::edit(disk))
}

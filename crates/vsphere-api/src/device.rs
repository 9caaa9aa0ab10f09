use serde::{Deserialize, Serialize};

use crate::types::{DeviceClass, DeviceKind, EthernetAdapter, NetworkBacking, VirtualDevice};

/// Keys for devices that don't exist yet are negative and start below this.
const NEW_KEY_BASE: i32 = -200;

/// An IDE controller exposes a master and a slave unit.
const IDE_UNITS_PER_CONTROLLER: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("no free device key left in device list")]
    KeySpaceExhausted,

    #[error("device {key} ({class:?}) cannot act as a cdrom controller")]
    UnsupportedController { key: i32, class: DeviceClass },

    #[error("controller {key} has no free unit number")]
    ControllerFull { key: i32 },
}

/// The hardware inventory of a virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceList(Vec<VirtualDevice>);

impl DeviceList {
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self(devices)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualDevice> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, device: VirtualDevice) {
        self.0.push(device);
    }

    pub fn select_by_class(&self, class: DeviceClass) -> impl Iterator<Item = &VirtualDevice> {
        self.0.iter().filter(move |d| d.class() == class)
    }

    /// Allocate a key for a device that will be added by a config spec.
    ///
    /// Returns one less than the lowest key in the list, or `-201` when no
    /// existing key is below `-200`.
    pub fn new_key(&self) -> Result<i32, DeviceError> {
        let lowest = self
            .0
            .iter()
            .map(|d| d.key)
            .fold(NEW_KEY_BASE, i32::min);
        lowest.checked_sub(1).ok_or(DeviceError::KeySpaceExhausted)
    }

    /// Build a cdrom drive attached to `controller` at its lowest free unit.
    ///
    /// The drive has no backing; callers set one before adding it.
    pub fn create_cdrom(&self, controller: &VirtualDevice) -> Result<VirtualDevice, DeviceError> {
        if controller.class() != DeviceClass::IdeController {
            return Err(DeviceError::UnsupportedController {
                key: controller.key,
                class: controller.class(),
            });
        }

        let unit_number = self.free_unit_number(controller.key, IDE_UNITS_PER_CONTROLLER)?;
        Ok(VirtualDevice {
            key: self.new_key()?,
            controller_key: Some(controller.key),
            unit_number: Some(unit_number),
            kind: DeviceKind::Cdrom { backing: None },
        })
    }

    pub fn create_ethernet_card(
        &self,
        adapter: EthernetAdapter,
        backing: NetworkBacking,
    ) -> Result<VirtualDevice, DeviceError> {
        Ok(VirtualDevice {
            key: self.new_key()?,
            controller_key: None,
            unit_number: None,
            kind: DeviceKind::EthernetCard {
                adapter,
                backing,
                address_type: "generated".into(),
            },
        })
    }

    fn free_unit_number(&self, controller_key: i32, units: i32) -> Result<i32, DeviceError> {
        let used: Vec<i32> = self
            .0
            .iter()
            .filter(|d| d.controller_key == Some(controller_key))
            .filter_map(|d| d.unit_number)
            .collect();

        (0..units)
            .find(|unit| !used.contains(unit))
            .ok_or(DeviceError::ControllerFull {
                key: controller_key,
            })
    }
}

impl From<Vec<VirtualDevice>> for DeviceList {
    fn from(devices: Vec<VirtualDevice>) -> Self {
        Self(devices)
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a VirtualDevice;
    type IntoIter = std::slice::Iter<'a, VirtualDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

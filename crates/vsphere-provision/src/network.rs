use vsphere_api::{DeviceChange, DeviceClass, DeviceList, EthernetAdapter};

use crate::devices::remove_devices_of_class;
use crate::session::Inventory;
use crate::{Error, Result};

/// Replace the template's NICs with one vmxnet3 card per network.
///
/// `networks` should already be de-duplicated; backings are resolved by
/// inventory name in the order given.
pub async fn network_specs(
    inventory: &dyn Inventory,
    vm: &str,
    devices: &DeviceList,
    networks: &[String],
) -> Result<Vec<DeviceChange>> {
    let mut specs = remove_devices_of_class(devices, DeviceClass::EthernetCard);

    let mut pending = devices.clone();
    for name in networks {
        let backing =
            inventory
                .network_backing(name)
                .await
                .map_err(|source| Error::NetworkNotFound {
                    name: name.clone(),
                    source,
                })?;

        let card = pending
            .create_ethernet_card(EthernetAdapter::Vmxnet3, backing)
            .map_err(|source| Error::Device {
                vm: vm.to_string(),
                source,
            })?;
        pending.push(card.clone());
        specs.push(DeviceChange::add(card));
    }

    Ok(specs)
}

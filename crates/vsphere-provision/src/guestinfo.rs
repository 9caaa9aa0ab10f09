//! Userdata injection through the vApp properties of Container Linux
//! templates.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use vsphere_api::{ArrayUpdateOperation, VAppConfig, VAppPropertyChange, VirtualMachine};

use crate::session::Inventory;
use crate::{Error, Result};

pub const COREOS_USERDATA_KEY: &str = "guestinfo.coreos.config.data";
pub const COREOS_USERDATA_ENCODING_KEY: &str = "guestinfo.coreos.config.data.encoding";

const USERDATA_ENCODING: &str = "base64";

/// Read the template's vApp properties and build the edits that set the
/// userdata slots.
pub async fn coreos_properties(
    inventory: &dyn Inventory,
    template: &VirtualMachine,
    userdata: &str,
) -> Result<Vec<VAppPropertyChange>> {
    let vapp = inventory
        .vapp_config(template)
        .await
        .map_err(|source| Error::PropertyRead {
            vm: template.name.clone(),
            source,
        })?;

    coreos_property_changes(&template.name, vapp.as_ref(), userdata)
}

/// Build `Edit` operations for the two userdata properties.
///
/// The properties must already exist in the template; their keys are reused
/// rather than allocated. Only the first property with each id is edited.
pub fn coreos_property_changes(
    template: &str,
    vapp: Option<&VAppConfig>,
    userdata: &str,
) -> Result<Vec<VAppPropertyChange>> {
    let vapp = vapp.ok_or_else(|| Error::MissingGuestSchema {
        template: template.to_string(),
    })?;

    let encoded = STANDARD.encode(userdata);
    let wanted: [(&'static str, &str); 2] = [
        (COREOS_USERDATA_KEY, encoded.as_str()),
        (COREOS_USERDATA_ENCODING_KEY, USERDATA_ENCODING),
    ];

    let mut specs = Vec::with_capacity(wanted.len());
    let mut missing = Vec::new();
    for (id, value) in wanted {
        match vapp.property.iter().find(|p| p.id == id) {
            Some(property) => {
                let mut info = property.clone();
                info.value = value.to_string();
                specs.push(VAppPropertyChange {
                    operation: ArrayUpdateOperation::Edit,
                    info,
                });
            }
            None => missing.push(id),
        }
    }

    if !missing.is_empty() {
        return Err(Error::IncompleteTemplate {
            template: template.to_string(),
            missing,
        });
    }

    Ok(specs)
}

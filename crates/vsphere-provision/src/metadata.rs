use vsphere_api::{CustomFieldValue, CustomFields, VirtualMachine};

use crate::session::Inventory;
use crate::{Error, Result};

/// Value of the custom field `field_name` on `vm`, or `""` if unset.
pub async fn value_for_field(
    inventory: &dyn Inventory,
    vm: &VirtualMachine,
    field_name: &str,
) -> Result<String> {
    let fields = inventory
        .custom_fields(vm)
        .await
        .map_err(|source| Error::PropertyRead {
            vm: vm.name.clone(),
            source,
        })?;

    Ok(custom_field_value(&fields, field_name).to_string())
}

/// Resolve a custom field by name. Undefined, unset and non-string fields all
/// read as the empty string.
pub fn custom_field_value<'a>(fields: &'a CustomFields, field_name: &str) -> &'a str {
    let Some(def) = fields
        .available_field
        .iter()
        .find(|def| def.name == field_name)
    else {
        return "";
    };

    match fields.value.iter().find(|v| v.key() == def.key) {
        Some(CustomFieldValue::String { value, .. }) => value,
        _ => "",
    }
}

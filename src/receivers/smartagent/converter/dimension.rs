// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::host::MetadataUpdate;
use crate::receivers::smartagent::datapoint::Dimension;

/// Placeholder value marking a property removal. Removal entries must carry
/// a non-empty value so the downstream exporter can tell a removed property
/// from a removed tag, which uses the empty string.
pub const PROPERTY_REMOVAL_SENTINEL: &str = "sf_delete_this_property";

/// Map a legacy dimension update onto the collector's metadata-update
/// structure. Properties with empty values become removals; tags map to
/// add or remove by their boolean.
pub fn dimension_to_metadata_update(dimension: &Dimension) -> MetadataUpdate {
    let mut to_add = BTreeMap::new();
    let mut to_update = BTreeMap::new();
    let mut to_remove = BTreeMap::new();

    for (key, value) in &dimension.properties {
        if value.is_empty() {
            to_remove.insert(key.clone(), PROPERTY_REMOVAL_SENTINEL.to_string());
        } else {
            to_update.insert(key.clone(), value.clone());
        }
    }

    for (key, enabled) in &dimension.tags {
        if *enabled {
            to_add.insert(key.clone(), String::new());
        } else {
            to_remove.insert(key.clone(), String::new());
        }
    }

    MetadataUpdate {
        resource_id_key: dimension.name.clone(),
        resource_id: dimension.value.clone(),
        metadata_to_add: to_add,
        metadata_to_remove: to_remove,
        metadata_to_update: to_update,
    }
}

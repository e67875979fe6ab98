//! Fuel shopping list aggregation

use fuelwatch_api::{CacheSnapshot, ShoppingList, ShoppingListEntry};

/// Fuel needed to top every online station up to its fuel target.
///
/// A station's target is its bay capacity divided by the per-unit volume.
/// Entries are grouped by fuel type in the order the types are first seen.
pub fn compute_shopping_list(snapshot: &CacheSnapshot, volume_per_unit: u64) -> ShoppingList {
    let mut entries: Vec<ShoppingListEntry> = Vec::new();

    if volume_per_unit == 0 {
        return ShoppingList { entries };
    }

    for record in &snapshot.stations {
        let Some(fuel) = record.burning_fuel() else {
            continue;
        };

        let target = record.capacity / volume_per_unit;
        let missing = match target.checked_sub(fuel.quantity) {
            Some(missing) if missing > 0 => missing,
            _ => continue,
        };

        match entries.iter_mut().find(|e| e.fuel_type_id == fuel.type_id) {
            Some(entry) => {
                entry.quantity += missing;
                entry.volume = entry.quantity * volume_per_unit;
            }
            None => entries.push(ShoppingListEntry {
                fuel_type_id: fuel.type_id,
                name: fuel.type_name.clone(),
                quantity: missing,
                volume: missing * volume_per_unit,
            }),
        }
    }

    ShoppingList { entries }
}

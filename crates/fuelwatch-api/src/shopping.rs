//! Fuel shopping list

use fuelwatch_util::TypeId;
use serde::{Deserialize, Serialize};

/// Aggregated replenishment need for one fuel type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    pub fuel_type_id: TypeId,
    pub name: String,
    pub quantity: u64,
    pub volume: u64,
}

/// Replenishment list in first-seen fuel type order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShoppingList {
    pub entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    pub fn total_volume(&self) -> u64 {
        self.entries.iter().map(|e| e.volume).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fuel_type_id: TypeId) -> Option<&ShoppingListEntry> {
        self.entries.iter().find(|e| e.fuel_type_id == fuel_type_id)
    }
}

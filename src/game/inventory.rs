//! # Inventory & Items
//!
//! Slot-limited containers and the item capability model. A concrete item
//! may combine capabilities: a healing potion is consumable, throwable and
//! exhaustable all at once.

use serde::{Deserialize, Serialize};

/// Effect applied when a consumable item is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumeEffect {
    /// Restore up to this much hp.
    Heal(u32),
}

/// An item with optional capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Present when the item can be consumed for an effect.
    pub consumable: Option<ConsumeEffect>,
    /// Whether the item can be hurled at an enemy.
    pub throwable: bool,
    /// Exhaustable items remove themselves from the owning inventory on use.
    pub exhaustable: bool,
}

impl Item {
    /// A standard healing potion: consumable, throwable and exhaustable.
    pub fn healing_potion(heal: u32) -> Self {
        Self {
            name: "Healing Potion".to_string(),
            consumable: Some(ConsumeEffect::Heal(heal)),
            throwable: true,
            exhaustable: true,
        }
    }

    pub fn is_consumable(&self) -> bool {
        self.consumable.is_some()
    }
}

/// A slot-limited item container.
///
/// # Examples
///
/// ```
/// use guildhall::{Inventory, Item};
///
/// let mut inventory = Inventory::new(2);
/// inventory.add(Item::healing_potion(5)).unwrap();
/// assert_eq!(inventory.occupied(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub capacity: usize,
    slots: Vec<Option<Item>>,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: vec![None; capacity],
        }
    }

    /// Stows an item in the first empty slot.
    ///
    /// Returns the slot index, or hands the item back when every slot is
    /// taken; the caller surfaces that as an inventory-full event rather
    /// than an error.
    pub fn add(&mut self, item: Item) -> Result<usize, Item> {
        match self.slots.iter().position(|slot| slot.is_none()) {
            Some(index) => {
                self.slots[index] = Some(item);
                Ok(index)
            }
            None => Err(item),
        }
    }

    /// Empties the given slot, returning its item.
    pub fn remove(&mut self, slot: usize) -> Option<Item> {
        self.slots.get_mut(slot).and_then(|s| s.take())
    }

    /// Empties the first slot holding an item equal to the given one.
    pub fn remove_item(&mut self, item: &Item) -> bool {
        for slot in &mut self.slots {
            if slot.as_ref() == Some(item) {
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn get(&self, slot: usize) -> Option<&Item> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Slots currently holding consumable items.
    pub fn consumables(&self) -> Vec<(usize, &Item)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|item| (i, item)))
            .filter(|(_, item)| item.is_consumable())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_until_full() {
        let mut inventory = Inventory::new(2);
        assert_eq!(inventory.add(Item::healing_potion(5)), Ok(0));
        assert_eq!(inventory.add(Item::healing_potion(5)), Ok(1));
        assert!(inventory.is_full());

        // A full inventory hands the item back untouched.
        let rejected = inventory.add(Item::healing_potion(9));
        assert_eq!(rejected, Err(Item::healing_potion(9)));
        assert_eq!(inventory.occupied(), 2);
    }

    #[test]
    fn test_remove_empties_slot() {
        let mut inventory = Inventory::new(3);
        inventory.add(Item::healing_potion(5)).unwrap();
        let item = inventory.remove(0).unwrap();
        assert_eq!(item.name, "Healing Potion");
        assert_eq!(inventory.occupied(), 0);
        assert!(inventory.remove(0).is_none());
    }

    #[test]
    fn test_remove_by_equality() {
        let mut inventory = Inventory::new(3);
        let potion = Item::healing_potion(5);
        inventory.add(potion.clone()).unwrap();

        assert!(inventory.remove_item(&potion));
        assert!(!inventory.remove_item(&potion));
        assert_eq!(inventory.occupied(), 0);
    }

    #[test]
    fn test_consumables_listing() {
        let mut inventory = Inventory::new(3);
        inventory.add(Item::healing_potion(5)).unwrap();
        inventory
            .add(Item {
                name: "Throwing Knife".to_string(),
                consumable: None,
                throwable: true,
                exhaustable: true,
            })
            .unwrap();

        let consumables = inventory.consumables();
        assert_eq!(consumables.len(), 1);
        assert_eq!(consumables[0].0, 0);
    }

    #[test]
    fn test_potion_combines_capabilities() {
        let potion = Item::healing_potion(5);
        assert!(potion.is_consumable());
        assert!(potion.throwable);
        assert!(potion.exhaustable);
    }
}

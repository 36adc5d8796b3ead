//! Slot+generation handle table backing the config and bridge handles.
//!
//! A destroyed handle keeps a stale generation, so later lookups return
//! `None` instead of touching freed memory. Destroying twice is a no-op.

/// Upper 32 bits: slot index. Lower 32 bits: generation.
fn encode(slot: u32, generation: u32) -> u64 {
    (u64::from(slot) << 32) | u64::from(generation)
}

fn decode(handle: u64) -> (u32, u32) {
    ((handle >> 32) as u32, handle as u32)
}

struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Maps opaque `u64` handles to owned values.
pub(crate) struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> HandleTable<T> {
    /// An empty table, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.data = Some(value);
            return encode(index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            data: Some(value),
        });
        encode(index, 0)
    }

    fn slot(&self, handle: u64) -> Option<&Slot<T>> {
        let (index, generation) = decode(handle);
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
    }

    /// The value behind `handle`, or `None` if it is stale or unknown.
    pub fn get(&self, handle: u64) -> Option<&T> {
        self.slot(handle)?.data.as_ref()
    }

    /// Mutable access to the value behind `handle`.
    pub fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        let (index, generation) = decode(handle);
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.data.as_mut()
    }

    /// Take the value behind `handle` out of the table.
    ///
    /// Bumps the slot's generation. A slot whose generation wraps to 0 is
    /// retired instead of reused, so a handle from its first epoch can
    /// never resolve again.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let (index, generation) = decode(handle);
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation != 0 {
            self.free_list.push(index);
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut table = HandleTable::new();
        let h = table.insert("config");
        assert_eq!(table.get(h), Some(&"config"));
        *table.get_mut(h).unwrap() = "changed";
        assert_eq!(table.get(h), Some(&"changed"));
    }

    #[test]
    fn removed_handle_is_stale() {
        let mut table = HandleTable::new();
        let h = table.insert(1u8);
        assert_eq!(table.remove(h), Some(1));
        assert_eq!(table.get(h), None);
        assert_eq!(table.get_mut(h), None);
        assert_eq!(table.remove(h), None);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut table = HandleTable::new();
        let h1 = table.insert(1u8);
        table.remove(h1);
        let h2 = table.insert(2u8);
        assert_eq!(decode(h1).0, decode(h2).0);
        assert_eq!(decode(h2).1, decode(h1).1 + 1);
        assert_eq!(table.get(h1), None);
        assert_eq!(table.get(h2), Some(&2));
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let table: HandleTable<u8> = HandleTable::new();
        assert_eq!(table.get(encode(7, 0)), None);
        assert_eq!(table.get(0), None);
    }

    #[test]
    fn wrapped_slot_is_retired() {
        let mut table = HandleTable::new();
        let h = table.insert(1u8);
        table.remove(h);
        table.slots[0].generation = u32::MAX;
        let h2 = table.insert(2u8);
        assert_eq!(decode(h2), (0, u32::MAX));
        table.remove(h2);
        assert_eq!(table.slots[0].generation, 0);
        assert!(table.free_list.is_empty());
        assert_eq!(table.get(encode(0, 0)), None);
        let h3 = table.insert(3u8);
        assert_eq!(decode(h3).0, 1);
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::Mutex;

use super::{KeyValueStore, Slot, SlotWrite};

/// Process-local slot storage. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<Slot, String>>>,
    read_only: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write fail, leaving the slots untouched.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        Ok(self.slots.lock().get(&slot).cloned())
    }

    fn write(&self, writes: &[SlotWrite]) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            bail!("memory store is read-only");
        }
        let mut slots = self.slots.lock();
        for write in writes {
            match &write.value {
                Some(value) => {
                    slots.insert(write.slot, value.clone());
                }
                None => {
                    slots.remove(&write.slot);
                }
            }
        }
        Ok(())
    }
}

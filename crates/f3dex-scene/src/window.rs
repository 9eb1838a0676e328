//! The 32-slot vertex index window that face commands address.

use crate::diagnostics::SlotFault;

/// Number of local slots in the window.
pub const WINDOW_SLOTS: usize = 32;

/// Highest start slot a load-indices command can encode after clamping.
pub const MAX_START_SLOT: usize = 63;

/// A populated window slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Index into the global vertex array.
    pub global: u32,
    /// Batch epoch the slot was loaded in.
    pub epoch: u32,
}

/// A slot a load could not populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkippedSlot {
    /// The computed global index is past the vertex array; the slot is now unset.
    Overflow { slot: usize, global: u32 },
    /// The slot number is past the window.
    OutOfWindow { slot: usize },
}

/// Maps local slot numbers to global vertex indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexIndexWindow {
    slots: [Option<WindowEntry>; WINDOW_SLOTS],
}

impl Default for VertexIndexWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexIndexWindow {
    pub fn new() -> Self {
        Self {
            slots: [None; WINDOW_SLOTS],
        }
    }

    /// Fill `count` slots from `start` with consecutive global indices from `base`.
    ///
    /// Slots whose index would reach `vertex_count` are cleared, slots past the
    /// window are ignored; both are reported and the remaining slots are still written.
    pub fn load(
        &mut self,
        start: usize,
        count: usize,
        base: u32,
        vertex_count: usize,
        epoch: u32,
    ) -> Vec<SkippedSlot> {
        let mut skipped = Vec::new();
        for (i, slot) in (start..start + count).enumerate() {
            let global = base.saturating_add(i as u32);
            let Some(entry) = self.slots.get_mut(slot) else {
                skipped.push(SkippedSlot::OutOfWindow { slot });
                continue;
            };
            if (global as usize) < vertex_count {
                *entry = Some(WindowEntry { global, epoch });
            } else {
                *entry = None;
                skipped.push(SkippedSlot::Overflow { slot, global });
            }
        }
        skipped
    }

    /// Global index in `slot`, provided it was loaded during `epoch`.
    pub fn resolve(&self, slot: usize, epoch: u32) -> Result<u32, SlotFault> {
        match self.slots.get(slot).copied().flatten() {
            None => Err(SlotFault::Unset),
            Some(entry) if entry.epoch != epoch => Err(SlotFault::Stale),
            Some(entry) => Ok(entry.global),
        }
    }

    pub fn get(&self, slot: usize) -> Option<WindowEntry> {
        self.slots.get(slot).copied().flatten()
    }
}

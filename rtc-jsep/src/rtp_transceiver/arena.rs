use super::JsepTransceiver;

/// Stable reference to a transceiver.
///
/// A handle stays valid across renegotiation. It stops resolving once the
/// transceiver is removed by a remote rollback, even though the slot is kept.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransceiverHandle {
    index: usize,
    generation: u32,
}

impl TransceiverHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    transceiver: JsepTransceiver,
}

/// Generational storage of the transceivers of a session, in creation order.
#[derive(Default, Debug, Clone)]
pub(crate) struct TransceiverArena {
    slots: Vec<Slot>,
}

impl TransceiverArena {
    pub(crate) fn insert(&mut self, transceiver: JsepTransceiver) -> TransceiverHandle {
        self.slots.push(Slot {
            generation: 0,
            transceiver,
        });
        TransceiverHandle {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Number of slots, including removed ones.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn get(&self, handle: TransceiverHandle) -> Option<&JsepTransceiver> {
        self.slots
            .get(handle.index)
            .filter(|s| s.generation == handle.generation && !s.transceiver.removed)
            .map(|s| &s.transceiver)
    }

    pub(crate) fn get_mut(&mut self, handle: TransceiverHandle) -> Option<&mut JsepTransceiver> {
        self.slots
            .get_mut(handle.index)
            .filter(|s| s.generation == handle.generation && !s.transceiver.removed)
            .map(|s| &mut s.transceiver)
    }

    /// at returns the transceiver in slot `index` unless it was removed.
    pub(crate) fn at(&self, index: usize) -> Option<&JsepTransceiver> {
        self.slots
            .get(index)
            .map(|s| &s.transceiver)
            .filter(|t| !t.removed)
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> Option<&mut JsepTransceiver> {
        self.slots
            .get_mut(index)
            .map(|s| &mut s.transceiver)
            .filter(|t| !t.removed)
    }

    /// remove marks the transceiver removed and invalidates its handles.
    pub(crate) fn remove(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.transceiver.removed = true;
            slot.generation = slot.generation.wrapping_add(1);
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (TransceiverHandle, &JsepTransceiver)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.transceiver.removed)
            .map(|(index, s)| {
                (
                    TransceiverHandle {
                        index,
                        generation: s.generation,
                    },
                    &s.transceiver,
                )
            })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut JsepTransceiver> {
        self.slots
            .iter_mut()
            .map(|s| &mut s.transceiver)
            .filter(|t| !t.removed)
    }

    /// find_index returns the slot of the first live transceiver matching `f`.
    pub(crate) fn find_index<F>(&self, mut f: F) -> Option<usize>
    where
        F: FnMut(&JsepTransceiver) -> bool,
    {
        self.slots
            .iter()
            .position(|s| !s.transceiver.removed && f(&s.transceiver))
    }
}

//! Event registry (generational slot map)
//!
//! Slots are reused through a free list and carry a generation, so an
//! `EventId` for a removed event never activates whatever takes its slot.
//! Activation is recorded in a sequence-keyed map: pending events run in
//! registration order and an event activated twice is pending once.

use std::collections::BTreeMap;

use crate::{Event, EventId};

#[derive(Debug)]
struct Entry {
    /// `None` while the callback is out being executed
    event: Option<Event>,
    sequence: u64,
    pending: bool,
    retired: bool,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Registry of events with pending-activation tracking
#[derive(Debug, Default)]
pub struct EventRegistry {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    pending: BTreeMap<u64, EventId>,
    retired: Vec<EventId>,
    next_sequence: u64,
    live: usize,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    fn entry(&self, id: EventId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: EventId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Register an event, returning its handle
    pub fn register(&mut self, event: Event) -> EventId {
        let entry = Entry {
            event: Some(event),
            sequence: self.next_sequence,
            pending: false,
            retired: false,
        };
        self.next_sequence += 1;
        self.live += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return EventId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        EventId {
            index,
            generation: 0,
        }
    }

    /// Remove an event.
    ///
    /// The event is handed back so the caller can drop it outside of any
    /// borrow. A currently executing event is removed without being returned.
    pub fn unregister(&mut self, id: EventId) -> Option<Event> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        if entry.pending {
            self.pending.remove(&entry.sequence);
        }
        entry.event
    }

    /// Whether the handle refers to a registered event
    pub fn contains(&self, id: EventId) -> bool {
        self.entry(id).is_some()
    }

    /// Mark an event pending.
    ///
    /// Returns `None` for removed or retired events.
    pub fn activate(&mut self, id: EventId) -> Option<EventId> {
        let entry = self.entry_mut(id)?;
        if entry.retired {
            return None;
        }
        if !entry.pending {
            entry.pending = true;
            let sequence = entry.sequence;
            self.pending.insert(sequence, id);
        }
        Some(id)
    }

    /// Mark every live event pending
    pub fn activate_all(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            if entry.retired || entry.pending {
                continue;
            }
            entry.pending = true;
            self.pending.insert(
                entry.sequence,
                EventId {
                    index: index as u32,
                    generation: slot.generation,
                },
            );
        }
    }

    /// Next pending event in registration order
    pub(crate) fn pop_pending(&mut self) -> Option<EventId> {
        let (_, id) = self.pending.pop_first()?;
        if let Some(entry) = self.entry_mut(id) {
            entry.pending = false;
        }
        Some(id)
    }

    /// Take the event out of its slot for execution
    pub(crate) fn take_event(&mut self, id: EventId) -> Option<Event> {
        let entry = self.entry_mut(id)?;
        if entry.retired {
            return None;
        }
        entry.event.take()
    }

    /// Put an executed event back.
    ///
    /// Fails, returning the event, when it was unregistered while running.
    pub(crate) fn restore_event(&mut self, id: EventId, event: Event) -> Result<(), Event> {
        match self.entry_mut(id) {
            Some(entry) => {
                assert!(entry.event.is_none(), "event {id:?} restored twice");
                entry.event = Some(event);
                Ok(())
            }
            None => Err(event),
        }
    }

    /// Schedule an event for removal at the next compaction
    pub(crate) fn retire(&mut self, id: EventId) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        if entry.retired {
            return;
        }
        entry.retired = true;
        let (pending, sequence) = (entry.pending, entry.sequence);
        entry.pending = false;
        if pending {
            self.pending.remove(&sequence);
        }
        self.retired.push(id);
    }

    /// Remove all retired events, returning them for dropping
    pub(crate) fn compact(&mut self) -> Vec<Event> {
        let retired = std::mem::take(&mut self.retired);
        retired
            .into_iter()
            .filter_map(|id| self.unregister(id))
            .collect()
    }

    /// Number of registered events
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of events awaiting execution
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

use crossbeam_channel::{Receiver, Sender, bounded};

/// A counting admission gate for the hashing workers.
///
/// `AdmissionGate` caps how many hash operations run at the same time. It is
/// a bounded token channel of `capacity` slots: acquiring a slot pushes a
/// token (blocking while the channel is full), and dropping the returned
/// [`SlotPermit`] pops one back out. At no instant can more than `capacity`
/// permits exist, and a permit is returned exactly once no matter how its
/// holder exits, a panic mid-hash included.
///
/// Task *dispatch* is deliberately not bounded by the gate; only the work
/// performed while a permit is held is.
#[derive(Clone)]
pub struct AdmissionGate {
    slots: Sender<()>,
    returns: Receiver<()>,
    capacity: usize,
}

impl AdmissionGate {
    /// Creates a gate with `capacity` slots. A capacity of zero is bumped to
    /// one, since a gate nothing can pass is never useful.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (slots, returns) = bounded(capacity);
        Self {
            slots,
            returns,
            capacity,
        }
    }

    /// Takes one slot, blocking while all of them are held.
    pub fn acquire(&self) -> SlotPermit {
        // The gate and every live permit hold both channel ends, so the
        // channel cannot disconnect underneath this send.
        self.slots
            .send(())
            .expect("admission gate channel disconnected");
        SlotPermit {
            returns: self.returns.clone(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held. Drives the worker column of the
    /// progress line.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

/// RAII slot handle; dropping it returns the slot to the gate.
pub struct SlotPermit {
    returns: Receiver<()>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        // One token per permit is in the channel by construction, so this
        // never blocks for long and never double-releases.
        let _ = self.returns.recv();
    }
}

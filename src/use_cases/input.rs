// Per-tick input staging area.
//
// One slot per tank, overwritten unconditionally: only the most recent
// sample matters when the tick applies it. Entries are retained across
// ticks, so a controller does not have to resend every tick; since rotation
// is delta-driven and fire is edge-triggered, re-applying the same sample is
// a no-op.

use std::collections::HashMap;

use crate::domain::{TankId, TankInput};

#[derive(Default)]
pub struct InputBuffer {
    entries: HashMap<TankId, TankInput>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; no queueing.
    pub fn set(&mut self, tank_id: TankId, input: TankInput) {
        self.entries.insert(tank_id, input);
    }

    /// Current staging snapshot, keyed by tank. Iteration order across tanks
    /// is unspecified.
    pub fn entries(&self) -> impl Iterator<Item = (&TankId, &TankInput)> {
        self.entries.iter()
    }

    /// Drops the slot for a destroyed or disconnected tank.
    pub fn remove(&mut self, tank_id: TankId) {
        self.entries.remove(&tank_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut buf = InputBuffer::new();
        buf.set(1, TankInput {
            beta: 10.0,
            ..Default::default()
        });
        buf.set(1, TankInput {
            beta: 20.0,
            ..Default::default()
        });
        assert_eq!(buf.len(), 1);
        let (_, input) = buf.entries().next().unwrap();
        assert_eq!(input.beta, 20.0);
    }

    #[test]
    fn entries_are_retained_across_reads() {
        let mut buf = InputBuffer::new();
        buf.set(1, TankInput::default());
        assert_eq!(buf.entries().count(), 1);
        // Reading does not drain.
        assert_eq!(buf.entries().count(), 1);
    }

    #[test]
    fn remove_drops_only_that_tank() {
        let mut buf = InputBuffer::new();
        buf.set(1, TankInput::default());
        buf.set(2, TankInput::default());
        buf.remove(1);
        assert_eq!(buf.len(), 1);
        assert!(buf.entries().all(|(id, _)| *id == 2));
    }
}

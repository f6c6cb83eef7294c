//! Fixed-capacity, epoch-tagged ring buffer.
//!
//! Entry `epoch` lives in slot `epoch % capacity`. Each slot remembers which
//! epoch it holds, so a read for an epoch whose slot was reused by a newer one
//! misses instead of returning the newer entry.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    slots: Vec<Option<(u32, T)>>,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A zero capacity is treated as one slot.
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1) as usize;
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    fn slot(&self, epoch: u32) -> usize {
        epoch as usize % self.slots.len()
    }

    /// Store `value` for `epoch`, overwriting whatever shared its slot.
    pub fn insert(&mut self, epoch: u32, value: T) {
        let slot = self.slot(epoch);
        self.slots[slot] = Some((epoch, value));
    }

    /// Entry for `epoch`, if its slot still holds that epoch.
    pub fn get(&self, epoch: u32) -> Option<&T> {
        match &self.slots[self.slot(epoch)] {
            Some((tag, value)) if *tag == epoch => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_and_evicts() {
        let mut buffer = RingBuffer::new(3);
        for epoch in 1..=3 {
            buffer.insert(epoch, epoch * 10);
        }
        assert_eq!(buffer.get(1), Some(&10));

        buffer.insert(4, 40);
        assert_eq!(buffer.get(1), None);
        assert_eq!(buffer.get(4), Some(&40));
        assert_eq!(buffer.get(2), Some(&20));
        assert_eq!(buffer.get(7), None);
    }

    #[test]
    fn test_empty_slots_miss() {
        let buffer: RingBuffer<u8> = RingBuffer::new(4);
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.get(0), None);
        assert_eq!(buffer.get(5), None);
    }
}

use crate::constants::{DEDUP_DIVISOR, EVENTS_COUNT};

/// Circular history of tick timestamps for the paperstrip.
///
/// The newest event sits at the write cursor and older ones are found by
/// walking backward. A slot holding 0 has never been written and ends the
/// walk, so a fresh ring never reports more events than were accepted.
pub struct EventRing {
    slots: Vec<u64>,
    cursor: usize,
}

impl EventRing {
    pub fn new() -> Self {
        Self::with_capacity(EVENTS_COUNT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Most recently accepted timestamp
    pub fn last(&self) -> Option<u64> {
        match self.slots[self.cursor] {
            0 => None,
            ts => Some(ts),
        }
    }

    /// Slot index of the newest event
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Append events later than the newest one by more than a quarter period.
    ///
    /// Adjacent analysis windows overlap, so the same tick is usually
    /// reported several times with slightly different timestamps. Returns
    /// the number of events accepted.
    ///
    /// # Arguments
    /// * `events` - Absolute timestamps, oldest first; a 0 ends the list
    /// * `period` - Current period estimate in samples
    pub fn ingest<I>(&mut self, events: I, period: f64) -> usize
    where
        I: IntoIterator<Item = u64>,
    {
        let gap = (period / DEDUP_DIVISOR).floor();
        let mut last = self.slots[self.cursor];
        let mut accepted = 0;

        for event in events {
            if event == 0 {
                break;
            }
            if event as f64 > last as f64 + gap {
                self.cursor = (self.cursor + 1) % self.slots.len();
                self.slots[self.cursor] = event;
                last = event;
                accepted += 1;
                log::trace!("event at {}", event);
            }
        }

        accepted
    }

    /// Forget every event.
    pub fn clear(&mut self) {
        self.slots.fill(0);
        self.cursor = 0;
    }

    /// `(slot, timestamp)` pairs, newest first.
    pub fn iter(&self) -> EventIter<'_> {
        EventIter {
            ring: self,
            pos: self.cursor,
            done: false,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.last().is_none()
    }
}

impl Default for EventRing {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventIter<'a> {
    ring: &'a EventRing,
    pos: usize,
    done: bool,
}

impl Iterator for EventIter<'_> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let slot = self.pos;
        let ts = self.ring.slots[slot];
        if ts == 0 {
            self.done = true;
            return None;
        }

        self.pos = if slot == 0 {
            self.ring.slots.len() - 1
        } else {
            slot - 1
        };
        if self.pos == self.ring.cursor {
            self.done = true;
        }

        Some((slot, ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ring() {
        let ring = EventRing::with_capacity(8);
        assert!(ring.is_empty());
        assert_eq!(ring.last(), None);
        assert_eq!(ring.iter().count(), 0);
    }

    #[test]
    fn test_newest_first() {
        let mut ring = EventRing::with_capacity(8);
        assert_eq!(ring.ingest([100, 200, 300], 40.0), 3);
        let ts: Vec<u64> = ring.iter().map(|(_, ts)| ts).collect();
        assert_eq!(ts, vec![300, 200, 100]);
        assert_eq!(ring.last(), Some(300));
    }

    #[test]
    fn test_dedup_boundary() {
        // floor(103 / 4) = 25
        let mut ring = EventRing::with_capacity(8);
        ring.ingest([1000], 103.0);
        assert_eq!(ring.ingest([1025], 103.0), 0);
        assert_eq!(ring.ingest([1026], 103.0), 1);
    }

    #[test]
    fn test_dedup_within_one_list() {
        let mut ring = EventRing::with_capacity(8);
        assert_eq!(ring.ingest([1000, 1010, 1100, 1105], 100.0), 2);
        let ts: Vec<u64> = ring.iter().map(|(_, ts)| ts).collect();
        assert_eq!(ts, vec![1100, 1000]);
    }

    #[test]
    fn test_overlapping_windows_not_duplicated() {
        let mut ring = EventRing::with_capacity(16);
        ring.ingest([1000, 2000, 3000], 2000.0);
        // Next window reports the same ticks with jitter plus one new tick
        ring.ingest([1003, 1998, 3002, 4001], 2000.0);
        let ts: Vec<u64> = ring.iter().map(|(_, ts)| ts).collect();
        assert_eq!(ts, vec![4001, 3000, 2000, 1000]);
    }

    #[test]
    fn test_terminator_stops_ingest() {
        let mut ring = EventRing::with_capacity(8);
        assert_eq!(ring.ingest([100, 0, 300], 4.0), 1);
    }

    #[test]
    fn test_retains_most_recent_capacity() {
        for capacity in [1usize, 2, 3, 7, 10] {
            let mut ring = EventRing::with_capacity(capacity);
            let events: Vec<u64> = (1..=(3 * capacity as u64 + 1)).map(|k| k * 1000).collect();
            ring.ingest(events.iter().copied(), 40.0);

            let kept: Vec<u64> = ring.iter().map(|(_, ts)| ts).collect();
            let expected: Vec<u64> = events.iter().rev().take(capacity).copied().collect();
            assert_eq!(kept, expected, "capacity {}", capacity);
        }
    }

    #[test]
    fn test_clear() {
        let mut ring = EventRing::with_capacity(4);
        ring.ingest([100, 200, 300, 400, 500], 4.0);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.cursor(), 0);
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.ingest([50], 4.0), 1);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_parity_alternates() {
        let mut ring = EventRing::with_capacity(16);
        ring.ingest([100, 200, 300, 400], 40.0);
        let parities: Vec<usize> = ring.iter().map(|(slot, _)| slot % 2).collect();
        assert_eq!(parities, vec![0, 1, 0, 1]);
    }
}

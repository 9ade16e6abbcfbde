/// Restores dispatch order for recognition results
///
/// Workers finish in any order. Results are parked by sequence id and
/// released only as a contiguous run starting at the next expected id.
use crate::ocr::RecognizedSnapshot;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ReorderBuffer {
    next_seq: u64,
    pending: BTreeMap<u64, RecognizedSnapshot>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(next_seq: u64) -> Self {
        Self {
            next_seq,
            pending: BTreeMap::new(),
        }
    }

    /// Park a snapshot until its turn
    ///
    /// Returns false for ids already delivered or already parked; those
    /// are dropped.
    pub fn push(&mut self, snapshot: RecognizedSnapshot) -> bool {
        let seq_id = snapshot.seq_id;
        if seq_id < self.next_seq || self.pending.contains_key(&seq_id) {
            tracing::warn!(
                "Dropping duplicate snapshot #{} (next expected #{})",
                seq_id,
                self.next_seq
            );
            return false;
        }
        self.pending.insert(seq_id, snapshot);
        true
    }

    /// Next snapshot in sequence, if it has arrived
    pub fn pop_ready(&mut self) -> Option<RecognizedSnapshot> {
        let snapshot = self.pending.remove(&self.next_seq)?;
        self.next_seq += 1;
        Some(snapshot)
    }

    /// Id the buffer is waiting for
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Snapshots parked behind a gap
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(seq_id: u64) -> RecognizedSnapshot {
        RecognizedSnapshot {
            seq_id,
            timestamp: seq_id * 100,
            text: format!("frame {seq_id}"),
        }
    }

    fn drain(buffer: &mut ReorderBuffer) -> Vec<u64> {
        std::iter::from_fn(|| buffer.pop_ready())
            .map(|s| s.seq_id)
            .collect()
    }

    #[test]
    fn test_out_of_order_arrival() {
        let mut buffer = ReorderBuffer::new();

        buffer.push(snapshot(2));
        assert!(drain(&mut buffer).is_empty());

        buffer.push(snapshot(0));
        assert_eq!(drain(&mut buffer), vec![0]);

        buffer.push(snapshot(1));
        assert_eq!(drain(&mut buffer), vec![1, 2]);
        assert_eq!(buffer.next_seq(), 3);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn test_gap_holds_back_later_results() {
        let mut buffer = ReorderBuffer::new();
        for seq in [1, 3, 4] {
            buffer.push(snapshot(seq));
        }
        assert!(drain(&mut buffer).is_empty());
        assert_eq!(buffer.pending(), 3);

        buffer.push(snapshot(0));
        assert_eq!(drain(&mut buffer), vec![0, 1]);

        buffer.push(snapshot(2));
        assert_eq!(drain(&mut buffer), vec![2, 3, 4]);
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut buffer = ReorderBuffer::new();
        assert!(buffer.push(snapshot(1)));
        assert!(!buffer.push(snapshot(1)));

        assert!(buffer.push(snapshot(0)));
        assert_eq!(drain(&mut buffer), vec![0, 1]);

        assert!(!buffer.push(snapshot(0)));
        assert_eq!(buffer.pending(), 0);
    }
}

/// Overlap removal between consecutive scans of a scrolling log
///
/// Two consecutive scans of the log region mostly show the same lines,
/// shifted up by however many entries arrived in between. The deduplicator
/// finds where the new scan structurally diverges (the anchor), locates that
/// anchor in the previous scan, and from the alignment works out how many
/// leading lines of the new scan were already seen.

use super::fuzzy::{fuzzy_equal, ANCHOR_TOLERANCE, LINE_TOLERANCE};

/// Anchor located in the current scan
#[derive(Debug, Clone, PartialEq)]
struct Anchor<'a> {
    lines: &'a [String],
    /// Index just past the anchor in the current scan, 0 when no divergence was found
    end: usize,
}

/// Stateful deduplicator; remembers the previous in-order scan
#[derive(Debug, Clone)]
pub struct LogDeduplicator {
    prev_lines: Vec<String>,
    anchor_tolerance: usize,
    line_tolerance: usize,
}

impl LogDeduplicator {
    /// Create a deduplicator with the default tolerances
    pub fn new() -> Self {
        Self::with_tolerances(ANCHOR_TOLERANCE, LINE_TOLERANCE)
    }

    /// Create a deduplicator with custom tolerances
    ///
    /// # Arguments
    /// * `anchor_tolerance` - Tolerance when scanning neighbouring lines for a divergence
    /// * `line_tolerance` - Tolerance when matching the anchor against the previous scan
    pub fn with_tolerances(anchor_tolerance: usize, line_tolerance: usize) -> Self {
        Self {
            prev_lines: Vec::new(),
            anchor_tolerance,
            line_tolerance,
        }
    }

    /// Lines remembered from the previous call
    pub fn previous(&self) -> &[String] {
        &self.prev_lines
    }

    /// Forget the previous scan
    pub fn reset(&mut self) {
        self.prev_lines.clear();
    }

    /// Return only the lines of `new_lines` not present in the previous scan
    ///
    /// When the anchor cannot be located in the previous scan, every line is
    /// treated as new: a duplicate now and then is preferable to dropping
    /// real entries.
    pub fn dedup(&mut self, new_lines: Vec<String>) -> Vec<String> {
        if new_lines.is_empty() || self.prev_lines.is_empty() {
            self.prev_lines = new_lines.clone();
            return new_lines;
        }

        let fresh = self.fresh_range(&new_lines);
        let result = new_lines[fresh..].to_vec();
        self.prev_lines = new_lines;
        result
    }

    /// Index into `new_lines` where genuinely new content starts
    fn fresh_range(&self, new_lines: &[String]) -> usize {
        let anchor = self.find_anchor(new_lines);

        if self.prev_lines.len() < anchor.lines.len() {
            return 0;
        }

        match self.find_in_previous(&anchor) {
            Some(prev_end) => {
                let overlap = self.prev_lines.len() - prev_end;
                (anchor.end + overlap).min(new_lines.len())
            }
            None => {
                tracing::trace!(
                    "Anchor not found in previous scan, keeping all {} lines",
                    new_lines.len()
                );
                0
            }
        }
    }

    /// First neighbouring pair that differs beyond the anchor tolerance
    fn find_anchor<'a>(&self, new_lines: &'a [String]) -> Anchor<'a> {
        if new_lines.len() < 2 {
            return Anchor {
                lines: new_lines,
                end: 0,
            };
        }

        for i in 1..new_lines.len() {
            if !fuzzy_equal(&new_lines[i - 1], &new_lines[i], self.anchor_tolerance) {
                return Anchor {
                    lines: &new_lines[i - 1..=i],
                    end: i + 1,
                };
            }
        }

        Anchor {
            lines: &new_lines[..2],
            end: 0,
        }
    }

    /// Position just past the anchor in the previous scan, if present
    ///
    /// The last previous line is never an anchor start.
    fn find_in_previous(&self, anchor: &Anchor<'_>) -> Option<usize> {
        let first = anchor.lines.first()?;
        let prev = &self.prev_lines;

        (0..prev.len().saturating_sub(1)).find_map(|i| {
            if !fuzzy_equal(&prev[i], first, self.line_tolerance) {
                return None;
            }
            match anchor.lines.get(1) {
                None => Some(i + 1),
                Some(second) if fuzzy_equal(&prev[i + 1], second, self.line_tolerance) => {
                    Some(i + 2)
                }
                Some(_) => None,
            }
        })
    }
}

impl Default for LogDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

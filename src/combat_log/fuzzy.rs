/// Tolerant line comparison
///
/// OCR output for the same on-screen line differs between scans by a
/// character or two. Lines are compared position by position; the length
/// difference counts as mismatches up front.

/// Tolerance used for general line equality
pub const LINE_TOLERANCE: usize = 1;

/// Looser tolerance used when looking for a genuine divergence between
/// neighbouring lines of one snapshot
pub const ANCHOR_TOLERANCE: usize = 6;

/// Returns true if `a` and `b` could be the same line modulo recognition noise
///
/// Counts characters (not bytes), so non-ASCII names compare the way they
/// read on screen.
pub fn fuzzy_equal(a: &str, b: &str, tolerance: usize) -> bool {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let len_diff = len_a.abs_diff(len_b);
    if len_diff > tolerance {
        return false;
    }

    let mut misses = len_diff;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            misses += 1;
            if misses > tolerance {
                return false;
            }
        }
    }

    true
}

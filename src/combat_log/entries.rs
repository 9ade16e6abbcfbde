/// Splitting raw recognized text into combat log lines
///
/// OCR returns one text line per visual row; a single log entry may wrap
/// across rows. Entries end with a period followed by a line break.

const ENTRY_TERMINATOR: &str = ".\n";

/// Split recognized text into normalized log lines
///
/// The first and last fragments are skipped: the capture region usually
/// cuts through an entry at both edges. Inner line breaks become spaces,
/// the trailing period is re-appended, and blank entries are dropped.
pub fn split_entries(text: &str) -> Vec<String> {
    let fragments: Vec<&str> = text.split(ENTRY_TERMINATOR).collect();
    if fragments.len() < 3 {
        return Vec::new();
    }

    fragments[1..fragments.len() - 1]
        .iter()
        .filter_map(|fragment| {
            let entry = fragment.replace('\n', " ");
            let entry = entry.trim();
            if entry.is_empty() {
                None
            } else {
                Some(format!("{entry}."))
            }
        })
        .collect()
}

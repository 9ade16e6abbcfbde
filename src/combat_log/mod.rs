/// Combat log processing
///
/// Turns the recognized text of one in-order snapshot into damage events.
///
/// ## Flow
///
/// ```text
/// recognized text
///   ├── entries   split into normalized lines (boundary fragments dropped)
///   ├── dedup     keep only lines not seen in the previous snapshot
///   ├── writer    optional append to the persisted combat log
///   └── parser    first-match-wins rules → DamageEvent
/// ```

pub mod dedup;
pub mod entries;
pub mod fuzzy;
pub mod parser;
pub mod writer;

pub use dedup::LogDeduplicator;
pub use entries::split_entries;
pub use fuzzy::{fuzzy_equal, ANCHOR_TOLERANCE, LINE_TOLERANCE};
pub use parser::{DamageEvent, DamageParser, FieldMap, Multiplier, ParseRule};
pub use writer::{CombatLogWriter, DEFAULT_COMBAT_LOG_PATH};

/// Diagnostic and persistence switches
#[derive(Debug, Clone, Default)]
pub struct CombatLogOptions {
    /// Log every parsed event under `dps_meter::damage`
    pub damage_log: bool,
    /// Log lines that matched no rule under `dps_meter::ignored`
    pub ignored_log: bool,
    /// Append new lines to this file
    pub save_to: Option<std::path::PathBuf>,
}

/// Snapshot text → new damage events, keeping dedup state across calls
///
/// Must be driven in snapshot order by a single owner.
pub struct CombatLogProcessor {
    deduplicator: LogDeduplicator,
    parser: DamageParser,
    writer: Option<CombatLogWriter>,
    damage_log: bool,
}

impl CombatLogProcessor {
    pub fn new(
        deduplicator: LogDeduplicator,
        mut parser: DamageParser,
        options: CombatLogOptions,
    ) -> Self {
        parser.set_report_ignored(options.ignored_log);
        Self {
            deduplicator,
            parser,
            writer: options.save_to.map(CombatLogWriter::new),
            damage_log: options.damage_log,
        }
    }

    /// Process the recognized text of one snapshot
    pub fn process(&mut self, text: &str, timestamp: u64) -> Vec<DamageEvent> {
        let lines = split_entries(text);
        let new_lines = self.deduplicator.dedup(lines);

        if let Some(writer) = &self.writer {
            writer.append(&new_lines, timestamp);
        }

        let events = self.parser.parse(&new_lines, timestamp);
        if self.damage_log {
            for event in &events {
                tracing::info!(
                    target: "dps_meter::damage",
                    "> {}: To {} {} {} {}",
                    event.timestamp,
                    event.target,
                    event.skill,
                    event.multiplier,
                    event.damage
                );
            }
        }

        events
    }
}

impl Default for CombatLogProcessor {
    fn default() -> Self {
        Self::new(LogDeduplicator::new(), DamageParser::new(), CombatLogOptions::default())
    }
}

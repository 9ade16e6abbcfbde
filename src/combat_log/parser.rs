/// Damage event parsing
///
/// Converts deduplicated combat log lines into structured damage events.
/// Rules are tried in order; the first matching rule produces the event
/// for that line.

use crate::error::CombatLogError;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;

/// Special hit category attached to a damage line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum Multiplier {
    /// Plain hit, no tag in the log
    #[default]
    Normal,
    Perfect,
    Critical,
    Smite,
    DoubleCritical,
    PerfectCritical,
}

impl Multiplier {
    /// Tag as it appears in the combat log ("" for a normal hit)
    pub fn label(&self) -> &'static str {
        match self {
            Multiplier::Normal => "",
            Multiplier::Perfect => "Perfect",
            Multiplier::Critical => "Critical",
            Multiplier::Smite => "Smite",
            Multiplier::DoubleCritical => "Double Critical",
            Multiplier::PerfectCritical => "Perfect Critical",
        }
    }

    /// Parse a captured tag, tolerating surrounding brackets
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().trim_start_matches('[').trim_end_matches(']').trim();
        match tag {
            "" => Some(Multiplier::Normal),
            "Perfect" => Some(Multiplier::Perfect),
            "Critical" => Some(Multiplier::Critical),
            "Smite" => Some(Multiplier::Smite),
            "Double Critical" => Some(Multiplier::DoubleCritical),
            "Perfect Critical" => Some(Multiplier::PerfectCritical),
            _ => None,
        }
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One parsed damage line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageEvent {
    /// Capture timestamp of the snapshot the line came from (ms since epoch)
    pub timestamp: u64,
    pub skill: String,
    pub target: String,
    pub damage: u64,
    pub multiplier: Multiplier,
}

/// Which capture group feeds which event field
///
/// `None` leaves the field at its empty/zero default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMap {
    pub skill: Option<usize>,
    pub target: Option<usize>,
    pub damage: Option<usize>,
    pub multiplier: Option<usize>,
}

/// A pattern plus its capture-group mapping
#[derive(Debug, Clone)]
pub struct ParseRule {
    name: &'static str,
    pattern: Regex,
    fields: FieldMap,
}

impl ParseRule {
    /// Compile a rule
    pub fn new(
        name: &'static str,
        pattern: &str,
        fields: FieldMap,
    ) -> Result<Self, CombatLogError> {
        let pattern = Regex::new(pattern).map_err(|source| CombatLogError::InvalidRule {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name,
            pattern,
            fields,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// "Used {skill} against {target} and dealt {amount} [{multiplier}] damage."
    pub fn direct_damage() -> Self {
        Self::builtin(
            "direct_damage",
            r"Used (.*?) against (.*?) and dealt ([0-9][0-9.,]*) (\[?(?:Perfect Critical|Double Critical|Perfect|Critical|Smite)\]?|) *damage\.",
            FieldMap {
                skill: Some(1),
                target: Some(2),
                damage: Some(3),
                multiplier: Some(4),
            },
        )
    }

    /// "Dealt additional damage of {amount} to {target}." (damage-over-time ticks)
    pub fn additional_damage() -> Self {
        Self::builtin(
            "additional_damage",
            r"Dealt additional damage of ([0-9][0-9.,]*) to (.*)\.",
            FieldMap {
                damage: Some(1),
                target: Some(2),
                ..FieldMap::default()
            },
        )
    }

    // Built-in patterns are literals covered by tests
    fn builtin(name: &'static str, pattern: &str, fields: FieldMap) -> Self {
        match Self::new(name, pattern, fields) {
            Ok(rule) => rule,
            Err(err) => panic!("built-in parse rule is invalid: {err}"),
        }
    }

    /// Apply the rule to one line
    ///
    /// A match whose amount does not fit in `u64`, or whose multiplier tag is
    /// unknown, is treated as no match.
    fn apply(&self, line: &str, timestamp: u64) -> Option<DamageEvent> {
        let caps = self.pattern.captures(line)?;

        let damage = match self.fields.damage {
            Some(group) => parse_amount(group_str(&caps, group))?,
            None => 0,
        };
        let multiplier = match self.fields.multiplier {
            Some(group) => Multiplier::from_tag(group_str(&caps, group))?,
            None => Multiplier::Normal,
        };

        Some(DamageEvent {
            timestamp,
            skill: self.fields.skill.map(|g| group_str(&caps, g).to_string()).unwrap_or_default(),
            target: self.fields.target.map(|g| group_str(&caps, g).to_string()).unwrap_or_default(),
            damage,
            multiplier,
        })
    }
}

fn group_str<'t>(caps: &Captures<'t>, group: usize) -> &'t str {
    caps.get(group).map(|m| m.as_str()).unwrap_or("")
}

/// Parse a numeral, dropping thousands separators ("1,250" / "1.250")
pub fn parse_amount(numeral: &str) -> Option<u64> {
    let digits: String = numeral.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Ordered, first-match-wins rule set
#[derive(Debug, Clone)]
pub struct DamageParser {
    rules: Vec<ParseRule>,
    report_ignored: bool,
}

impl DamageParser {
    /// Parser with the built-in rules (direct damage, then additional damage)
    pub fn new() -> Self {
        Self::with_rules(vec![ParseRule::direct_damage(), ParseRule::additional_damage()])
    }

    /// Parser with a custom rule list, tried in the given order
    pub fn with_rules(rules: Vec<ParseRule>) -> Self {
        Self {
            rules,
            report_ignored: false,
        }
    }

    /// Log lines that match no rule under the `dps_meter::ignored` target
    pub fn set_report_ignored(&mut self, enabled: bool) {
        self.report_ignored = enabled;
    }

    pub fn rules(&self) -> &[ParseRule] {
        &self.rules
    }

    /// Parse a single line with the first matching rule
    pub fn parse_line(&self, line: &str, timestamp: u64) -> Option<DamageEvent> {
        self.rules.iter().find_map(|rule| rule.apply(line, timestamp))
    }

    /// Parse lines into events; unmatched lines are dropped
    pub fn parse<S: AsRef<str>>(&self, lines: &[S], timestamp: u64) -> Vec<DamageEvent> {
        lines
            .iter()
            .filter_map(|line| {
                let line = line.as_ref();
                let event = self.parse_line(line, timestamp);
                if event.is_none() && self.report_ignored {
                    tracing::info!(target: "dps_meter::ignored", "- {}", line);
                }
                event
            })
            .collect()
    }
}

impl Default for DamageParser {
    fn default() -> Self {
        Self::new()
    }
}

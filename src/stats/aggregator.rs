/// Cumulative and sliding-window damage statistics
///
/// The moving average is mean damage per event inside the trailing window,
/// not damage per second. Sums saturate at `u64::MAX`: a misread numeral
/// can be as large as the parser accepts.

use crate::combat_log::{DamageEvent, Multiplier};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Default sliding window length
pub const DEFAULT_WINDOW_MS: u64 = 1000;

/// Damage recorded for one multiplier tag of a skill
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiplierStats {
    pub damage: Vec<u64>,
    pub total_damage: u64,
}

impl MultiplierStats {
    fn record(&mut self, damage: u64) {
        self.damage.push(damage);
        self.total_damage = self.total_damage.saturating_add(damage);
    }
}

/// Damage recorded for one skill name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillStats {
    pub damage: Vec<u64>,
    pub total_damage: u64,
    pub by_multiplier: BTreeMap<Multiplier, MultiplierStats>,
}

impl SkillStats {
    fn record(&mut self, event: &DamageEvent) {
        self.damage.push(event.damage);
        self.total_damage = self.total_damage.saturating_add(event.damage);
        self.by_multiplier
            .entry(event.multiplier)
            .or_default()
            .record(event.damage);
    }

    pub fn hits(&self) -> usize {
        self.damage.len()
    }
}

/// Running statistics over the event stream
///
/// Owned and mutated by the pipeline consumer only.
#[derive(Debug, Clone)]
pub struct DamageAggregator {
    window_ms: u64,
    count: u64,
    total: u64,
    average: f64,
    moving_average: f64,
    last_timestamp: u64,
    window: VecDeque<DamageEvent>,
    by_skill: BTreeMap<String, SkillStats>,
}

impl DamageAggregator {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_MS)
    }

    pub fn with_window(window_ms: u64) -> Self {
        Self {
            window_ms,
            count: 0,
            total: 0,
            average: 0.0,
            moving_average: 0.0,
            last_timestamp: 0,
            window: VecDeque::new(),
            by_skill: BTreeMap::new(),
        }
    }

    /// Fold one snapshot's events into the statistics
    ///
    /// Called once per processed snapshot, also with no events, so the window
    /// keeps sliding with `now`.
    pub fn ingest(&mut self, events: Vec<DamageEvent>, now: u64) {
        self.count += events.len() as u64;
        for event in events {
            self.total = self.total.saturating_add(event.damage);
            self.by_skill
                .entry(event.skill.clone())
                .or_default()
                .record(&event);
            self.window.push_back(event);
        }

        self.last_timestamp = now;
        self.average = if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        };
        self.moving_average = self.windowed_average(now);

        tracing::debug!(
            "= {}: {:.2} {:.2}",
            now,
            self.moving_average,
            self.average
        );
    }

    /// Drop events older than the window and average what is left
    fn windowed_average(&mut self, now: u64) -> f64 {
        let cutoff = now.saturating_sub(self.window_ms);
        self.window.retain(|event| event.timestamp >= cutoff);

        if self.window.is_empty() {
            return 0.0;
        }
        let sum = self
            .window
            .iter()
            .fold(0u64, |sum, event| sum.saturating_add(event.damage));
        sum as f64 / self.window.len() as f64
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn moving_average(&self) -> f64 {
        self.moving_average
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Events currently inside the sliding window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn by_skill(&self) -> &BTreeMap<String, SkillStats> {
        &self.by_skill
    }
}

impl Default for DamageAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Damage statistics
///
/// The aggregator is owned by the pipeline consumer. Readers (display,
/// reporting) poll a [`StatsHandle`] which holds the latest published
/// [`StatsSnapshot`] and a bounded history of chart points.

pub mod aggregator;

pub use aggregator::{DamageAggregator, MultiplierStats, SkillStats, DEFAULT_WINDOW_MS};

use crate::combat_log::Multiplier;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Default number of chart points kept
pub const DEFAULT_HISTORY_POINTS: usize = 100;

/// Hit count and damage sum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DamageTally {
    pub hits: u64,
    pub total_damage: u64,
}

impl From<&MultiplierStats> for DamageTally {
    fn from(stats: &MultiplierStats) -> Self {
        Self {
            hits: stats.damage.len() as u64,
            total_damage: stats.total_damage,
        }
    }
}

/// Per-skill totals without the raw damage sequences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillSummary {
    pub hits: u64,
    pub total_damage: u64,
    pub by_multiplier: BTreeMap<Multiplier, DamageTally>,
}

impl From<&SkillStats> for SkillSummary {
    fn from(stats: &SkillStats) -> Self {
        Self {
            hits: stats.hits() as u64,
            total_damage: stats.total_damage,
            by_multiplier: stats
                .by_multiplier
                .iter()
                .map(|(multiplier, tally)| (*multiplier, DamageTally::from(tally)))
                .collect(),
        }
    }
}

/// Read-only copy of the aggregate state at one point in time
///
/// Built after every delivered snapshot, so its size depends on the number
/// of distinct skills only. Raw damage sequences stay in the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub event_count: u64,
    pub total_damage: u64,
    pub average: f64,
    pub moving_average: f64,
    pub last_timestamp: u64,
    pub skills: BTreeMap<String, SkillSummary>,
}

impl StatsSnapshot {
    pub fn from_aggregator(aggregator: &DamageAggregator) -> Self {
        Self {
            event_count: aggregator.count(),
            total_damage: aggregator.total(),
            average: aggregator.average(),
            moving_average: aggregator.moving_average(),
            last_timestamp: aggregator.last_timestamp(),
            skills: aggregator
                .by_skill()
                .iter()
                .map(|(name, stats)| (name.clone(), SkillSummary::from(stats)))
                .collect(),
        }
    }
}

/// One chart sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Seconds since the first published update
    pub seconds: f64,
    pub moving_average: f64,
    pub average: f64,
}

#[derive(Debug)]
struct StatsInner {
    snapshot: StatsSnapshot,
    history: VecDeque<ChartPoint>,
    history_capacity: usize,
    start_timestamp: Option<u64>,
}

/// Shared, pollable statistics; last write wins
#[derive(Debug, Clone)]
pub struct StatsHandle {
    inner: Arc<RwLock<StatsInner>>,
}

impl StatsHandle {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY_POINTS)
    }

    pub fn with_history(history_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatsInner {
                snapshot: StatsSnapshot::default(),
                history: VecDeque::with_capacity(history_capacity),
                history_capacity,
                start_timestamp: None,
            })),
        }
    }

    /// Replace the published snapshot
    ///
    /// A chart point is recorded only when the timestamp moved.
    pub fn publish(&self, snapshot: StatsSnapshot) {
        let mut inner = self.inner.write();

        if inner.snapshot.last_timestamp != snapshot.last_timestamp && inner.history_capacity > 0 {
            let start = *inner.start_timestamp.get_or_insert(snapshot.last_timestamp);
            let point = ChartPoint {
                seconds: snapshot.last_timestamp.saturating_sub(start) as f64 / 1000.0,
                moving_average: snapshot.moving_average,
                average: snapshot.average,
            };
            if inner.history.len() == inner.history_capacity {
                inner.history.pop_front();
            }
            inner.history.push_back(point);
        }

        inner.snapshot = snapshot;
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.read().snapshot.clone()
    }

    /// Chart points, oldest first
    pub fn history(&self) -> Vec<ChartPoint> {
        self.inner.read().history.iter().copied().collect()
    }
}

impl Default for StatsHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::{DamageEvent, Multiplier};

    fn hit(timestamp: u64, damage: u64) -> DamageEvent {
        DamageEvent {
            timestamp,
            skill: "Fireball".to_string(),
            target: "Golem".to_string(),
            damage,
            multiplier: Multiplier::Normal,
        }
    }

    #[test]
    fn test_publish_and_poll() {
        let handle = StatsHandle::new();
        let reader = handle.clone();

        let mut agg = DamageAggregator::new();
        agg.ingest(vec![hit(1_000, 10), hit(1_000, 30)], 1_000);
        handle.publish(StatsSnapshot::from_aggregator(&agg));

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.total_damage, 40);
        assert_eq!(snapshot.average, 20.0);
        assert_eq!(snapshot.moving_average, 20.0);
        assert_eq!(snapshot.last_timestamp, 1_000);
        assert_eq!(snapshot.skills["Fireball"].hits, 2);
    }

    #[test]
    fn test_snapshot_summarizes_skills() {
        let mut agg = DamageAggregator::new();
        let mut crit = hit(1_000, 900);
        crit.multiplier = Multiplier::Critical;
        let mut frost = hit(1_000, 5);
        frost.skill = "Frost Nova".to_string();
        agg.ingest(vec![hit(1_000, 10), crit, hit(1_000, 30), frost], 1_000);

        let snapshot = StatsSnapshot::from_aggregator(&agg);
        let fireball = &snapshot.skills["Fireball"];
        assert_eq!(fireball.hits, 3);
        assert_eq!(fireball.total_damage, 940);
        assert_eq!(
            fireball.by_multiplier[&Multiplier::Normal],
            DamageTally {
                hits: 2,
                total_damage: 40
            }
        );
        assert_eq!(fireball.by_multiplier[&Multiplier::Critical].hits, 1);
        assert_eq!(snapshot.skills["Frost Nova"].total_damage, 5);

        // The aggregator keeps the individual amounts
        assert_eq!(agg.by_skill()["Fireball"].damage, vec![10, 900, 30]);
    }

    #[test]
    fn test_history_only_on_new_timestamp() {
        let handle = StatsHandle::new();
        let mut agg = DamageAggregator::new();

        agg.ingest(vec![hit(1_000, 10)], 1_000);
        handle.publish(StatsSnapshot::from_aggregator(&agg));
        handle.publish(StatsSnapshot::from_aggregator(&agg));

        agg.ingest(vec![hit(3_500, 30)], 3_500);
        handle.publish(StatsSnapshot::from_aggregator(&agg));

        let history = handle.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].seconds, 0.0);
        assert_eq!(history[1].seconds, 2.5);
        assert_eq!(history[1].moving_average, 30.0);
        assert_eq!(history[1].average, 20.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let handle = StatsHandle::with_history(3);
        for ts in 1..=5u64 {
            handle.publish(StatsSnapshot {
                last_timestamp: ts * 1_000,
                ..StatsSnapshot::default()
            });
        }

        let seconds: Vec<f64> = handle.history().iter().map(|p| p.seconds).collect();
        assert_eq!(seconds, vec![2.0, 3.0, 4.0]);
    }
}

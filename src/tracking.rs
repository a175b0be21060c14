use crate::config::ObserverPosition;
use crate::parser::OrbitalRecord;
use crate::propagation::{LookAngle, PropagationError, Propagator};
use chrono::{DateTime, Utc};
use std::ops::Index;
use tracing::debug;

/// A record paired with its most recent look angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked {
    pub record: OrbitalRecord,
    pub look: LookAngle,
}

/// Records ranked by distance from one observer.
///
/// The order is only meaningful right after [`sort`](Self::sort); `add` and
/// `recompute` leave it as it was.
pub struct TrackedSatellites<P> {
    observer: ObserverPosition,
    propagator: P,
    computed_at: DateTime<Utc>,
    entries: Vec<Tracked>,
}

impl<P: Propagator> TrackedSatellites<P> {
    pub fn new(observer: ObserverPosition, propagator: P) -> Self {
        Self {
            observer,
            propagator,
            computed_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Add every record, then sort once.
    pub fn from_records(
        observer: ObserverPosition,
        propagator: P,
        records: impl IntoIterator<Item = OrbitalRecord>,
    ) -> (Self, Vec<PropagationError>) {
        let mut sats = Self::new(observer, propagator);
        let failures = records
            .into_iter()
            .filter_map(|record| sats.add(record).err())
            .collect();
        sats.sort();
        (sats, failures)
    }

    /// Append a record with its look angle at the current timestamp. On
    /// failure the record is still added, with [`LookAngle::UNAVAILABLE`].
    pub fn add(&mut self, record: OrbitalRecord) -> Result<(), PropagationError> {
        let result = self
            .propagator
            .look_angle(&record, &self.observer, self.computed_at);
        let (look, outcome) = match result {
            Ok(look) => (look, Ok(())),
            Err(err) => (LookAngle::UNAVAILABLE, Err(err)),
        };
        self.entries.push(Tracked { record, look });
        outcome
    }

    /// Move the timestamp to now and recompute every look angle.
    pub fn recompute(&mut self) -> Vec<PropagationError> {
        self.recompute_at(Utc::now())
    }

    pub fn recompute_at(&mut self, at: DateTime<Utc>) -> Vec<PropagationError> {
        self.computed_at = at;
        let mut failures = Vec::new();
        for entry in &mut self.entries {
            match self.propagator.look_angle(&entry.record, &self.observer, at) {
                Ok(look) => entry.look = look,
                Err(err) => {
                    entry.look = LookAngle::UNAVAILABLE;
                    failures.push(err);
                }
            }
        }
        if !failures.is_empty() {
            debug!("{} of {} objects unavailable", failures.len(), self.entries.len());
        }
        failures
    }

    /// Stable sort by ascending range.
    pub fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| a.look.range.total_cmp(&b.look.range));
    }
}

impl<P> TrackedSatellites<P> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tracked> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Tracked> {
        self.entries.get(index)
    }

    /// Current row of the given catalog number.
    pub fn position_of(&self, catalog_id: u32) -> Option<usize> {
        self.entries
            .iter()
            .position(|t| t.record.catalog_id() == catalog_id)
    }

    pub fn observer(&self) -> &ObserverPosition {
        &self.observer
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn unavailable_count(&self) -> usize {
        self.entries.iter().filter(|t| !t.look.is_available()).count()
    }
}

impl<P> Index<usize> for TrackedSatellites<P> {
    type Output = Tracked;

    fn index(&self, index: usize) -> &Tracked {
        &self.entries[index]
    }
}

impl<'a, P> IntoIterator for &'a TrackedSatellites<P> {
    type Item = &'a Tracked;
    type IntoIter = std::slice::Iter<'a, Tracked>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

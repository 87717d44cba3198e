//! Aggregation of per-cell matrix results into the route cache
//!
//! The [`RouteAggregator`] owns the accumulating cache for one run. Each
//! successful sub-query response is interpreted cell by cell and merged
//! under an explicit [`MergePolicy`].

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::client::MatrixResponse;
use crate::core::location::Location;
use crate::core::partition::SubQuery;

/// Cached road distance and duration for one ordered location pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCacheEntry {
    /// Kilometers, rounded to one decimal place
    pub distance_km: f64,
    pub duration_seconds: u64,
}

/// Route cache keyed by `"{origin_id}_{destination_id}"`
pub type RouteCache = BTreeMap<String, RouteCacheEntry>;

pub fn cache_key(origin_id: &str, destination_id: &str) -> String {
    format!("{origin_id}_{destination_id}")
}

/// Meters to kilometers, rounded to one decimal place.
///
/// Ties are decided on the exact binary value and go to the even digit, so
/// 1250 m is 1.2 km while 1350 m (just above 1.35 as a float) is 1.4 km.
pub fn meters_to_km(meters: f64) -> f64 {
    let km = meters / 1000.0;
    format!("{km:.1}").parse().unwrap_or(km)
}

/// Status reported for a cell that is missing from the response grid
pub const MISSING_ELEMENT_STATUS: &str = "MISSING_ELEMENT";

/// Interpretation of one origin/destination cell
#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome {
    Ok {
        distance_km: f64,
        duration_seconds: u64,
    },
    Failed {
        status: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementResult {
    pub origin_id: String,
    pub destination_id: String,
    pub outcome: ElementOutcome,
}

/// What to do when a key is produced a second time within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Replace the stored entry with the newer one
    #[default]
    LastWriteWins,
    /// Keep the stored entry and drop the newer one
    KeepFirst,
}

/// Counts for a single absorbed sub-query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsorbOutcome {
    pub routes: usize,
    pub failures: usize,
}

/// Interpret every non-self cell of a response, in row-major order
pub fn interpret_response(subquery: &SubQuery<'_>, response: &MatrixResponse) -> Vec<ElementResult> {
    let mut results = Vec::with_capacity(subquery.element_count());

    for (i, origin) in subquery.origins.iter().enumerate() {
        for (j, destination) in subquery.destinations.iter().enumerate() {
            if origin.id == destination.id {
                continue;
            }

            let outcome = match response.element(i, j) {
                Some(element) if element.status == "OK" => {
                    match (&element.distance, &element.duration) {
                        (Some(distance), Some(duration)) => ElementOutcome::Ok {
                            distance_km: meters_to_km(distance.value),
                            duration_seconds: duration.value,
                        },
                        _ => ElementOutcome::Failed {
                            status: "OK_WITHOUT_VALUES".to_string(),
                        },
                    }
                }
                Some(element) => ElementOutcome::Failed {
                    status: element.status.clone(),
                },
                None => ElementOutcome::Failed {
                    status: MISSING_ELEMENT_STATUS.to_string(),
                },
            };

            results.push(ElementResult {
                origin_id: origin.id.clone(),
                destination_id: destination.id.clone(),
                outcome,
            });
        }
    }

    results
}

/// Accumulates route cache entries and element failures for one run
#[derive(Debug, Default)]
pub struct RouteAggregator {
    policy: MergePolicy,
    routes: RouteCache,
    failures: Vec<String>,
    overwrites: usize,
}

impl RouteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Merge one sub-query's response into the cache
    pub fn absorb(&mut self, subquery: &SubQuery<'_>, response: &MatrixResponse) -> AbsorbOutcome {
        let mut outcome = AbsorbOutcome::default();

        for result in interpret_response(subquery, response) {
            match result.outcome {
                ElementOutcome::Ok {
                    distance_km,
                    duration_seconds,
                } => {
                    let key = cache_key(&result.origin_id, &result.destination_id);
                    self.insert(
                        key,
                        RouteCacheEntry {
                            distance_km,
                            duration_seconds,
                        },
                    );
                    outcome.routes += 1;
                }
                ElementOutcome::Failed { status } => {
                    let line = failure_line(subquery, &result.origin_id, &result.destination_id, &status);
                    warn!("  Warning: {line}");
                    self.failures.push(line);
                    outcome.failures += 1;
                }
            }
        }

        outcome
    }

    fn insert(&mut self, key: String, entry: RouteCacheEntry) {
        match self.routes.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                self.overwrites += 1;
                match self.policy {
                    MergePolicy::LastWriteWins => {
                        debug!("Overwriting cached route {}", slot.key());
                        slot.insert(entry);
                    }
                    MergePolicy::KeepFirst => {
                        debug!("Keeping first cached route {}", slot.key());
                    }
                }
            }
        }
    }

    pub fn routes(&self) -> &RouteCache {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Human readable element failure lines, in the order they occurred
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Number of times a key was produced again after its first write
    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    pub fn into_routes(self) -> RouteCache {
        self.routes
    }
}

fn failure_line(subquery: &SubQuery<'_>, origin_id: &str, destination_id: &str, status: &str) -> String {
    let name_of = |id: &str, pool: &[Location]| {
        pool.iter()
            .find(|l| l.id == id)
            .map(|l| l.short_name())
            .unwrap_or_else(|| id.to_string())
    };

    format!(
        "{} -> {}: {}",
        name_of(origin_id, subquery.origins),
        name_of(destination_id, subquery.destinations),
        status
    )
}

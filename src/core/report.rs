//! Completeness reporting for a route generation run

use std::fmt;

use log::{info, warn};

/// Outcome of one route generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub requests_issued: usize,
    /// Sub-queries that failed at the transport or service level
    pub requests_failed: usize,
    pub routes_cached: usize,
    pub routes_expected: usize,
    pub element_failures: usize,
}

/// Number of ordered non-self pairs among `location_count` locations
pub fn expected_routes(location_count: usize) -> usize {
    location_count * location_count.saturating_sub(1)
}

impl RunSummary {
    pub fn new(
        location_count: usize,
        requests_issued: usize,
        requests_failed: usize,
        routes_cached: usize,
        element_failures: usize,
    ) -> Self {
        Self {
            requests_issued,
            requests_failed,
            routes_cached,
            routes_expected: expected_routes(location_count),
            element_failures,
        }
    }

    /// Routes missing from the cache
    pub fn deficit(&self) -> usize {
        self.routes_expected.saturating_sub(self.routes_cached)
    }

    pub fn is_complete(&self) -> bool {
        self.deficit() == 0
    }

    /// Log the summary; a deficit is a warning, never an error
    pub fn log(&self) {
        info!("API requests made: {}", self.requests_issued);
        info!("Total routes cached: {}", self.routes_cached);
        info!("Expected routes: {}", self.routes_expected);

        if !self.is_complete() {
            warn!(
                "{} routes failed ({} failed requests, {} failed elements)",
                self.deficit(),
                self.requests_failed,
                self.element_failures
            );
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API requests made: {}", self.requests_issued)?;
        writeln!(f, "Total routes cached: {}", self.routes_cached)?;
        write!(f, "Expected routes: {}", self.routes_expected)?;
        if !self.is_complete() {
            write!(f, "\nWarning: {} routes failed!", self.deficit())?;
        }
        Ok(())
    }
}

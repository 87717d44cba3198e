//! Batch partitioning of the pairwise location matrix
//!
//! The full N×N origin/destination space is split into contiguous index
//! chunks, and every (row chunk, column chunk) combination becomes one
//! sub-query. Self pairs are left in place; the aggregator drops them.

use std::ops::Range;

use crate::core::error::{Error, Result};
use crate::core::location::Location;

/// Request size limits imposed by the distance-matrix service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of origins, and of destinations, per request (B)
    pub max_dimension: usize,

    /// Maximum number of origin×destination elements per request (E)
    pub max_elements: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_dimension: 25,
            max_elements: 100,
        }
    }
}

impl BatchLimits {
    /// Side length of the square chunks used for both rows and columns.
    ///
    /// `min(B, floor(sqrt(E)))`, so a full chunk pair never exceeds E elements.
    pub fn chunk_size(&self) -> Result<usize> {
        if self.max_dimension == 0 || self.max_elements == 0 {
            return Err(Error::InvalidInput(format!(
                "batch limits must be positive (max_dimension={}, max_elements={})",
                self.max_dimension, self.max_elements
            )));
        }

        Ok(self.max_dimension.min(integer_sqrt(self.max_elements)))
    }
}

fn integer_sqrt(value: usize) -> usize {
    let mut root = (value as f64).sqrt() as usize;
    while root.checked_mul(root).map_or(true, |square| square > value) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|square| square <= value) {
        root += 1;
    }
    root
}

/// Split `[0, len)` into contiguous ranges of at most `chunk_size` indices.
///
/// The last range may be shorter. `len == 0` yields no ranges; a zero
/// `chunk_size` is rejected.
pub fn partition(len: usize, chunk_size: usize) -> Result<Vec<Range<usize>>> {
    if chunk_size == 0 {
        return Err(Error::InvalidInput("chunk size must be positive".to_string()));
    }

    Ok((0..len)
        .step_by(chunk_size)
        .map(|start| start..start.saturating_add(chunk_size).min(len))
        .collect())
}

/// One grid cell of the matrix: a rectangular origin×destination block
#[derive(Debug, Clone)]
pub struct SubQuery<'a> {
    /// Position in issue order, starting at 0
    pub index: usize,
    pub rows: Range<usize>,
    pub columns: Range<usize>,
    pub origins: &'a [Location],
    pub destinations: &'a [Location],
}

impl SubQuery<'_> {
    pub fn element_count(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }

    /// Human readable, 1-based description of the block
    pub fn describe(&self) -> String {
        format!(
            "origins [{}-{}] × destinations [{}-{}]",
            self.rows.start + 1,
            self.rows.end,
            self.columns.start + 1,
            self.columns.end
        )
    }
}

/// Build the ordered sub-query grid, row-group-major then column-group-major.
///
/// Produces `ceil(N/chunk)²` cells covering every ordered index pair once.
pub fn plan_subqueries(locations: &[Location], chunk_size: usize) -> Result<Vec<SubQuery<'_>>> {
    let chunks = partition(locations.len(), chunk_size)?;

    Ok(chunks
        .iter()
        .flat_map(|rows| chunks.iter().map(move |columns| (rows.clone(), columns.clone())))
        .enumerate()
        .map(|(index, (rows, columns))| SubQuery {
            index,
            origins: &locations[rows.clone()],
            destinations: &locations[columns.clone()],
            rows,
            columns,
        })
        .collect())
}

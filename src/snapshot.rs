//! Flattened page-table snapshots
//!
//! A snapshot is an ascending, non-overlapping sequence of mapped
//! regions captured at one point in time. Regions are not pre-merged;
//! adjacent entries may share attributes, and the run query below merges
//! them on the fly. Addresses absent from the sequence are unmapped.

use crate::attributes::MemoryAttributes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One mapped region of the address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub start: u64,
    pub length: u64,
    #[serde(default)]
    pub attributes: MemoryAttributes,
}

impl MemoryRegion {
    pub fn new(start: u64, length: u64, attributes: MemoryAttributes) -> Self {
        Self {
            start,
            length,
            attributes,
        }
    }

    /// Exclusive end of the region
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Snapshot integrity violations detected during a query
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot region {index} has zero length")]
    ZeroLength { index: usize },

    #[error("snapshot region {index} overlaps or precedes its predecessor")]
    OutOfOrder { index: usize },
}

/// Coverage classification for a run query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run covers the whole requested range
    Found,
    /// The run covers a leading portion of the requested range
    PartiallyFound,
    /// The queried address is not mapped
    NoMapping,
}

/// Maximal same-attribute run starting at a queried address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRun {
    pub status: RunStatus,
    pub attributes: MemoryAttributes,
    /// Amount of the requested range this run accounts for
    pub checked_length: u64,
}

/// Borrowed view over an ordered region sequence
#[derive(Debug, Clone, Copy)]
pub struct PageTableSnapshot<'a> {
    regions: &'a [MemoryRegion],
}

impl<'a> PageTableSnapshot<'a> {
    pub fn new(regions: &'a [MemoryRegion]) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &'a [MemoryRegion] {
        self.regions
    }

    /// Reports the maximal run starting at `address`, capped at `length`
    /// bytes.
    ///
    /// A run is the longest stretch of contiguous entries sharing
    /// identical attributes; an unmapped hole is reported as `NoMapping`
    /// up to the next mapped entry. `checked_length` is never zero for a
    /// non-empty request.
    pub fn region_attributes(
        &self,
        address: u64,
        length: u64,
    ) -> Result<RegionRun, SnapshotError> {
        let request_end = address.saturating_add(length);

        let index = self.regions.partition_point(|r| r.end() <= address);
        if index >= self.regions.len() {
            return Ok(RegionRun {
                status: RunStatus::NoMapping,
                attributes: MemoryAttributes::empty(),
                checked_length: length,
            });
        }

        let first = &self.regions[index];
        if first.length == 0 {
            return Err(SnapshotError::ZeroLength { index });
        }
        if index > 0 && self.regions[index - 1].end() > first.start {
            return Err(SnapshotError::OutOfOrder { index });
        }

        // Hole before the next mapped entry.
        if first.start > address {
            let hole_end = first.start.min(request_end);
            return Ok(RegionRun {
                status: RunStatus::NoMapping,
                attributes: MemoryAttributes::empty(),
                checked_length: hole_end - address,
            });
        }

        // Mapped: extend across contiguous entries with identical
        // attributes.
        let attributes = first.attributes;
        let mut run_end = first.end();
        let mut next = index + 1;
        while run_end < request_end && next < self.regions.len() {
            let region = &self.regions[next];
            if region.length == 0 {
                return Err(SnapshotError::ZeroLength { index: next });
            }
            if region.start < run_end {
                return Err(SnapshotError::OutOfOrder { index: next });
            }
            if region.start != run_end || region.attributes != attributes {
                break;
            }
            run_end = region.end();
            next += 1;
        }

        let covered_end = run_end.min(request_end);
        let status = if covered_end >= request_end {
            RunStatus::Found
        } else {
            RunStatus::PartiallyFound
        };

        Ok(RegionRun {
            status,
            attributes,
            checked_length: covered_end - address,
        })
    }
}

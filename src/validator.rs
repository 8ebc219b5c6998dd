//! Region-attribute validation over a page-table snapshot
//!
//! The validator walks the requested range run by run and compares each
//! run's aggregated attributes against the required policy. Mismatches
//! do not stop the walk; a single scan collects every violation in the
//! range.

use crate::attributes::MemoryAttributes;
use crate::report::RuleReport;
use crate::snapshot::{PageTableSnapshot, RunStatus};

/// How required attributes are compared against a run's aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every required bit must be present
    All,
    /// At least one required bit must be present
    Any,
}

/// One validation scan over a snapshot range
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest {
    pub address: u64,
    pub length: u64,
    pub required: MemoryAttributes,
    pub match_mode: MatchMode,
    /// Treat unmapped holes as satisfying the policy
    pub allow_unmapped: bool,
    /// Record each mismatching run into the rule report
    pub log_mismatch: bool,
}

/// Walks the snapshot over `request` and checks every run against the
/// required attributes.
///
/// Unexpected lookup failures and zero-progress queries abort the scan
/// as failed; reaching the end of the address space ends it. Returns
/// true iff the whole range satisfied the policy.
pub fn validate_region_attributes(
    snapshot: PageTableSnapshot<'_>,
    request: &ValidationRequest,
    report: &mut RuleReport,
) -> bool {
    let mut address = request.address;
    let mut remaining = request.length;
    let mut matches = true;

    while remaining > 0 {
        let run = match snapshot.region_attributes(address, remaining) {
            Ok(run) => run,
            Err(err) => {
                tracing::warn!("failed to query attributes at {address:#x}: {err}");
                report.record_scan_error(address, err.to_string());
                return false;
            }
        };

        match run.status {
            RunStatus::Found | RunStatus::PartiallyFound => {
                let satisfied = match request.match_mode {
                    MatchMode::All => run.attributes.contains(request.required),
                    MatchMode::Any => run.attributes.intersects(request.required),
                };
                if !satisfied {
                    if request.log_mismatch {
                        report.record_mismatch(
                            address,
                            address.saturating_add(run.checked_length),
                            request.required,
                            request.match_mode,
                        );
                    }
                    matches = false;
                }
            }
            RunStatus::NoMapping => {
                if !request.allow_unmapped {
                    if request.log_mismatch {
                        report.record_unmapped(address, address.saturating_add(run.checked_length));
                    }
                    matches = false;
                }
            }
        }

        if run.checked_length == 0 {
            tracing::warn!("no progress parsing the page table at {address:#x}");
            report.record_scan_error(address, "query advanced zero length".to_string());
            return false;
        }

        address = match address.checked_add(run.checked_length) {
            Some(next) => next,
            // End of the address space.
            None => break,
        };
        remaining = remaining.saturating_sub(run.checked_length);
    }

    matches
}

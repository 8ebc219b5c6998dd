//! Property-based tests over the core engine
//!
//! Covers the validator's match semantics, run-splitting independence,
//! strict subsumption and the buffer growth protocol.

use proptest::prelude::*;
use vigia::attributes::MemoryAttributes;
use vigia::buffer::SnapshotBuffer;
use vigia::exceptions::{ExceptionMatcher, SpecialRegion};
use vigia::providers::ProbeOutcome;
use vigia::report::RuleReport;
use vigia::snapshot::{MemoryRegion, PageTableSnapshot};
use vigia::validator::{validate_region_attributes, MatchMode, ValidationRequest};

fn attributes_strategy() -> impl Strategy<Value = MemoryAttributes> {
    (0u64..8).prop_map(MemoryAttributes::from_bits_truncate)
}

/// Adjacent page-aligned regions starting at 0x1000 with arbitrary
/// attribute masks
fn contiguous_regions() -> impl Strategy<Value = Vec<MemoryRegion>> {
    prop::collection::vec((1u64..4, attributes_strategy()), 1..16).prop_map(|specs| {
        let mut regions = Vec::with_capacity(specs.len());
        let mut start = 0x1000u64;
        for (pages, attributes) in specs {
            let length = pages * 0x1000;
            regions.push(MemoryRegion::new(start, length, attributes));
            start += length;
        }
        regions
    })
}

fn span(regions: &[MemoryRegion]) -> (u64, u64) {
    let start = regions[0].start;
    let end = regions[regions.len() - 1].end();
    (start, end - start)
}

fn run_validate(
    regions: &[MemoryRegion],
    required: MemoryAttributes,
    match_mode: MatchMode,
) -> bool {
    let (address, length) = span(regions);
    let mut report = RuleReport::new("prop");
    validate_region_attributes(
        PageTableSnapshot::new(regions),
        &ValidationRequest {
            address,
            length,
            required,
            match_mode,
            allow_unmapped: false,
            log_mismatch: true,
        },
        &mut report,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_match_all_holds_iff_every_region_carries_all_bits(
        regions in contiguous_regions(),
        required in attributes_strategy(),
    ) {
        prop_assume!(!required.is_empty());
        let expected = regions.iter().all(|r| r.attributes.contains(required));
        prop_assert_eq!(run_validate(&regions, required, MatchMode::All), expected);
    }

    #[test]
    fn prop_match_any_holds_iff_every_region_carries_some_bit(
        regions in contiguous_regions(),
        required in attributes_strategy(),
    ) {
        prop_assume!(!required.is_empty());
        let expected = regions.iter().all(|r| r.attributes.intersects(required));
        prop_assert_eq!(run_validate(&regions, required, MatchMode::Any), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_result_is_independent_of_run_splitting(
        regions in contiguous_regions(),
        required in attributes_strategy(),
    ) {
        prop_assume!(!required.is_empty());

        // Merge adjacent same-attribute entries into maximal runs.
        let mut merged: Vec<MemoryRegion> = Vec::new();
        for region in &regions {
            match merged.last_mut() {
                Some(last) if last.end() == region.start && last.attributes == region.attributes => {
                    last.length += region.length;
                }
                _ => merged.push(*region),
            }
        }

        for mode in [MatchMode::All, MatchMode::Any] {
            prop_assert_eq!(
                run_validate(&regions, required, mode),
                run_validate(&merged, required, mode)
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_subsumption_is_strict(
        start in 0x1000u64..0x1000_0000,
        length in 2u64..0x10000,
    ) {
        let exact = [SpecialRegion { start, length, attributes: MemoryAttributes::empty() }];
        let matcher = ExceptionMatcher::new(Some(&exact), None, None);
        prop_assert!(matcher.is_exempt(start, length));

        let short = [SpecialRegion { start, length: length - 1, attributes: MemoryAttributes::empty() }];
        let matcher = ExceptionMatcher::new(Some(&short), None, None);
        prop_assert!(!matcher.is_exempt(start, length));

        let shifted = [SpecialRegion { start: start + 1, length, attributes: MemoryAttributes::empty() }];
        let matcher = ExceptionMatcher::new(Some(&shifted), None, None);
        prop_assert!(!matcher.is_exempt(start, length));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_growth_protocol_provides_headroom(required in 1usize..5000) {
        let mut buffer: SnapshotBuffer<u8> = SnapshotBuffer::new();
        let mut calls = 0;
        let mut fill_capacity = 0;
        let entries = buffer
            .acquire(|buf: &mut [u8]| {
                calls += 1;
                if calls == 1 {
                    ProbeOutcome::NeedsCapacity(required)
                } else {
                    fill_capacity = buf.len();
                    ProbeOutcome::Ready(required)
                }
            })
            .unwrap();

        prop_assert_eq!(entries.len(), required);
        prop_assert!(fill_capacity >= required);
        prop_assert!(buffer.capacity() >= required + required.div_ceil(5));
    }
}

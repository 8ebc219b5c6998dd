//! The audit rule set
//!
//! Each rule captures what it needs through the context, walks its
//! candidate regions, and accumulates every violation before reporting a
//! single pass/fail. Rules are stateless over a fixed capture and run
//! independently; a rule that cannot even acquire its inputs fails with
//! the error recorded, and the session moves on to the next rule.

use crate::attributes::MemoryAttributes;
use crate::buffer::BufferError;
use crate::context::AuditContext;
use crate::firmware::{MemoryKind, ResourceKind, PAGE_SIZE};
use crate::image::{is_section_aligned, SectionFlags};
use crate::interval::{align_down, align_up};
use crate::providers::Platform;
use crate::report::{AuditReport, RuleReport, Violation};
use crate::validator::{validate_region_attributes, MatchMode, ValidationRequest};
use thiserror::Error;

/// Errors that abort a single rule before its scan can run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("the platform reported no resource map")]
    MissingResourceMap,
}

type RuleFn = fn(&mut AuditContext, &dyn Platform) -> Result<RuleReport, RuleError>;

const RULES: &[(&str, RuleFn)] = &[
    ("no-read-write-execute", no_read_write_execute),
    (
        "unallocated-memory-is-read-protected",
        unallocated_memory_is_read_protected,
    ),
    ("null-page-is-read-protected", null_page_is_read_protected),
    ("mmio-is-exec-protected", mmio_is_exec_protected),
    (
        "image-code-read-only-data-exec-protected",
        image_code_read_only_data_exec_protected,
    ),
    ("stack-guard", stack_guard),
    (
        "memory-outside-memory-map-is-inaccessible",
        memory_outside_memory_map_is_inaccessible,
    ),
    (
        "attribute-enforcement-present",
        attribute_enforcement_present,
    ),
];

/// Runs every rule sequentially over one session's captures.
///
/// Individual rule failures never stop the session; an errored rule is
/// reported as failed with the error in its violation log.
pub fn run_all(ctx: &mut AuditContext, platform: &dyn Platform) -> AuditReport {
    let mut rules = Vec::with_capacity(RULES.len());
    for (name, rule) in RULES {
        match rule(ctx, platform) {
            Ok(report) => rules.push(report),
            Err(err) => {
                tracing::error!("{name} aborted: {err}");
                let mut report = RuleReport::new(name);
                report.record(Violation::general(format!("rule aborted: {err}")));
                rules.push(report);
            }
        }
    }
    AuditReport { rules }
}

/// Names of every rule, in execution order
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|(name, _)| *name).collect()
}

/// No region may be simultaneously readable, writable and executable
/// unless an exception source explicitly allows it.
pub fn no_read_write_execute(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("no-read-write-execute");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_exception_lists(platform);
    ctx.ensure_resource_map(platform);
    if ctx.resource_map().is_none() {
        return Err(RuleError::MissingResourceMap);
    }
    ctx.ensure_page_table(platform)?;

    let matcher = ctx.exception_matcher();
    for region in ctx.page_table().regions() {
        if region.attributes.is_read_write_execute()
            && !matcher.is_exempt(region.start, region.length)
        {
            report.record(Violation::range(
                region.start,
                region.end(),
                &[],
                format!(
                    "memory range {:#x}-{:#x} is read/write/execute",
                    region.start,
                    region.end()
                ),
            ));
        }
    }

    Ok(report)
}

/// Conventional (unallocated) memory must be read-protected or absent
/// from the page table.
pub fn unallocated_memory_is_read_protected(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("unallocated-memory-is-read-protected");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    ctx.ensure_memory_map(platform)?;

    let snapshot = ctx.page_table();
    for entry in ctx.memory_map() {
        if entry.kind == MemoryKind::Conventional {
            validate_region_attributes(
                snapshot,
                &ValidationRequest {
                    address: entry.physical_start,
                    length: entry.byte_length(),
                    required: MemoryAttributes::READ_PROTECT,
                    match_mode: MatchMode::Any,
                    allow_unmapped: true,
                    log_mismatch: true,
                },
                &mut report,
            );
        }
    }

    Ok(report)
}

/// The null page must be read-protected or unmapped so null
/// dereferences fault.
pub fn null_page_is_read_protected(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("null-page-is-read-protected");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    validate_region_attributes(
        ctx.page_table(),
        &ValidationRequest {
            address: 0,
            length: PAGE_SIZE,
            required: MemoryAttributes::READ_PROTECT,
            match_mode: MatchMode::Any,
            allow_unmapped: true,
            log_mismatch: true,
        },
        &mut report,
    );

    Ok(report)
}

/// MMIO ranges from both the memory map and the resource map must be
/// non-executable or inaccessible.
pub fn mmio_is_exec_protected(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("mmio-is-exec-protected");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    ctx.ensure_memory_map(platform)?;
    ctx.ensure_resource_map(platform);
    if ctx.resource_map().is_none() {
        return Err(RuleError::MissingResourceMap);
    }

    let snapshot = ctx.page_table();
    let required = MemoryAttributes::EXEC_PROTECT | MemoryAttributes::READ_PROTECT;

    for entry in ctx.memory_map() {
        if entry.kind == MemoryKind::Mmio {
            validate_region_attributes(
                snapshot,
                &ValidationRequest {
                    address: entry.physical_start,
                    length: entry.byte_length(),
                    required,
                    match_mode: MatchMode::Any,
                    allow_unmapped: true,
                    log_mismatch: true,
                },
                &mut report,
            );
        }
    }

    for descriptor in ctx.resource_map().unwrap_or_default() {
        if descriptor.kind == ResourceKind::Mmio {
            validate_region_attributes(
                snapshot,
                &ValidationRequest {
                    address: descriptor.base,
                    length: descriptor.length,
                    required,
                    match_mode: MatchMode::Any,
                    allow_unmapped: true,
                    log_mismatch: true,
                },
                &mut report,
            );
        }
    }

    Ok(report)
}

/// Loaded-image code sections must be read-only and data sections
/// non-executable; a section mixing code and data is itself a violation.
pub fn image_code_read_only_data_exec_protected(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("image-code-read-only-data-exec-protected");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    let snapshot = ctx.page_table();

    for image in platform.loaded_images() {
        if !is_section_aligned(image.section_alignment, image.memory_type) {
            report.record(Violation::range(
                image.base,
                image.end(),
                &[],
                format!(
                    "image {}: {:#x}-{:#x} is not aligned",
                    image.name,
                    image.base,
                    image.end()
                ),
            ));
            continue;
        }

        let alignment = u64::from(image.section_alignment).max(1);
        for section in &image.sections {
            let start = image.base + section.virtual_address;
            let end = start + align_up(section.raw_size, alignment);
            let flags = section.flags;

            if flags.contains(SectionFlags::CODE)
                && flags
                    .intersects(SectionFlags::INITIALIZED_DATA | SectionFlags::UNINITIALIZED_DATA)
            {
                report.record(Violation::range(
                    start,
                    end,
                    &[],
                    format!(
                        "image {}: section {start:#x}-{end:#x} contains code and data",
                        image.name
                    ),
                ));
            } else if flags.contains(SectionFlags::EXECUTABLE)
                && !flags.contains(SectionFlags::WRITABLE)
            {
                let readonly = ValidationRequest {
                    address: start,
                    length: end - start,
                    required: MemoryAttributes::READ_ONLY,
                    match_mode: MatchMode::All,
                    allow_unmapped: false,
                    log_mismatch: false,
                };
                if !validate_region_attributes(snapshot, &readonly, &mut report) {
                    report.record(Violation::range(
                        start,
                        end,
                        &MemoryAttributes::READ_ONLY.names(),
                        format!(
                            "image {}: section {start:#x}-{end:#x} is not read-only",
                            image.name
                        ),
                    ));
                }
            } else {
                let non_exec = ValidationRequest {
                    address: start,
                    length: end - start,
                    required: MemoryAttributes::EXEC_PROTECT,
                    match_mode: MatchMode::All,
                    allow_unmapped: false,
                    log_mismatch: false,
                };
                if !validate_region_attributes(snapshot, &non_exec, &mut report) {
                    report.record(Violation::range(
                        start,
                        end,
                        &MemoryAttributes::EXEC_PROTECT.names(),
                        format!(
                            "image {}: section {start:#x}-{end:#x} is not exec-protected",
                            image.name
                        ),
                    ));
                }
            }
        }
    }

    Ok(report)
}

/// The boot stack must be non-executable and start with an inaccessible
/// guard page to catch overflow.
pub fn stack_guard(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("stack-guard");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    let snapshot = ctx.page_table();

    let Some(stack) = platform.boot_stack() else {
        tracing::warn!("no boot stack record reported; skipping stack checks");
        return Ok(report);
    };

    let base = align_down(stack.base, PAGE_SIZE);
    let length = align_up(stack.length, PAGE_SIZE);
    if length == 0 {
        tracing::warn!("boot stack record has zero length; skipping stack checks");
        return Ok(report);
    }
    tracing::info!("boot stack located at {base:#x}-{:#x}", base + length);

    let guard = ValidationRequest {
        address: base,
        length: PAGE_SIZE,
        required: MemoryAttributes::READ_PROTECT,
        match_mode: MatchMode::Any,
        allow_unmapped: true,
        log_mismatch: false,
    };
    if !validate_region_attributes(snapshot, &guard, &mut report) {
        report.record(Violation::range(
            base,
            base + PAGE_SIZE,
            &MemoryAttributes::READ_PROTECT.names(),
            format!(
                "stack {base:#x}-{:#x} does not have an inaccessible guard page to catch overflow",
                base + PAGE_SIZE
            ),
        ));
    }

    let body = ValidationRequest {
        address: base + PAGE_SIZE,
        length: length - PAGE_SIZE,
        required: MemoryAttributes::EXEC_PROTECT,
        match_mode: MatchMode::Any,
        allow_unmapped: false,
        log_mismatch: false,
    };
    if !validate_region_attributes(snapshot, &body, &mut report) {
        report.record(Violation::range(
            base + PAGE_SIZE,
            base + length,
            &MemoryAttributes::EXEC_PROTECT.names(),
            format!(
                "stack {:#x}-{:#x} is not exec-protected",
                base + PAGE_SIZE,
                base + length
            ),
        ));
    }

    Ok(report)
}

/// Every address span the memory map does not cover, bounded by the
/// platform's resource space, must be inaccessible.
pub fn memory_outside_memory_map_is_inaccessible(
    ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("memory-outside-memory-map-is-inaccessible");
    tracing::debug!("{} enter", report.name);

    ctx.ensure_page_table(platform)?;
    ctx.ensure_memory_map(platform)?;
    ctx.ensure_resource_map(platform);

    let resources = ctx
        .resource_map()
        .filter(|map| !map.is_empty())
        .ok_or(RuleError::MissingResourceMap)?;
    let start_of_address_space = resources[0].base;
    let end_of_address_space = resources[resources.len() - 1].end();

    let snapshot = ctx.page_table();
    let mut gap_check = |start: u64, end: u64, report: &mut RuleReport| {
        validate_region_attributes(
            snapshot,
            &ValidationRequest {
                address: start,
                length: end - start,
                required: MemoryAttributes::READ_PROTECT,
                match_mode: MatchMode::Any,
                allow_unmapped: true,
                log_mismatch: true,
            },
            report,
        );
    };

    let mut last_end = start_of_address_space;
    for entry in ctx.memory_map() {
        if entry.physical_start > last_end {
            gap_check(last_end, entry.physical_start, &mut report);
        }
        last_end = entry.end();
    }
    if last_end < end_of_address_space {
        gap_check(last_end, end_of_address_space, &mut report);
    }

    Ok(report)
}

/// Hardware memory-attribute enforcement must be available on the
/// platform.
pub fn attribute_enforcement_present(
    _ctx: &mut AuditContext,
    platform: &dyn Platform,
) -> Result<RuleReport, RuleError> {
    let mut report = RuleReport::new("attribute-enforcement-present");
    tracing::debug!("{} enter", report.name);

    if !platform.attribute_enforcement() {
        report.record(Violation::general(
            "platform does not report hardware memory-attribute enforcement".to_string(),
        ));
    }

    Ok(report)
}

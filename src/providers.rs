//! Provider seams for platform state acquisition
//!
//! The engine never discovers hardware topology itself; everything it
//! audits arrives through [`Platform`]. Snapshot-shaped data follows the
//! probe/fill convention of [`ProbeOutcome`], list-shaped data is handed
//! over whole.

use crate::exceptions::{ImageRange, SpecialRegion};
use crate::firmware::{BootStack, MemoryMapEntry, ResourceDescriptor};
use crate::image::LoadedImage;
use crate::snapshot::MemoryRegion;

/// Result of a single fill call against a snapshot provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The buffer was filled with `count` valid elements
    Ready(usize),
    /// The buffer is too small; `count` elements are required
    NeedsCapacity(usize),
    /// The provider failed and no data is available
    Failed,
}

/// Supplies every snapshot and list one audit session consumes
pub trait Platform {
    /// Fill `buf` with the flattened page-table regions, ascending by
    /// start address. A zero-capacity call reports the required count.
    fn fill_page_table(&self, buf: &mut [MemoryRegion]) -> ProbeOutcome;

    /// Fill `buf` with the firmware memory map. Input order is not
    /// guaranteed; the engine sorts after acquisition.
    fn fill_memory_map(&self, buf: &mut [MemoryMapEntry]) -> ProbeOutcome;

    /// Full resource map, sorted ascending and gap-free, or None when
    /// the platform cannot report one.
    fn resource_map(&self) -> Option<Vec<ResourceDescriptor>>;

    /// Platform-declared special regions, or None when the source was
    /// never populated (distinct from an empty list).
    fn special_regions(&self) -> Option<Vec<SpecialRegion>>;

    /// Images loaded without memory protection, or None when the source
    /// was never populated.
    fn non_protected_images(&self) -> Option<Vec<ImageRange>>;

    /// Every loaded image with its extracted section ranges
    fn loaded_images(&self) -> Vec<LoadedImage>;

    /// The boot processor's stack allocation record
    fn boot_stack(&self) -> Option<BootStack>;

    /// Whether hardware memory-attribute enforcement is available
    fn attribute_enforcement(&self) -> bool;
}

//! Session-scoped ownership of snapshots and exception lists
//!
//! One [`AuditContext`] owns every buffer and list an audit session
//! captures. Accessors populate lazily and cache: repeated rules reuse
//! the same capture until [`AuditContext::invalidate`] drops it.
//! Everything is released together when the context goes out of scope,
//! on every exit path.

use crate::buffer::{page_elements, BufferError, SnapshotBuffer};
use crate::exceptions::{ExceptionMatcher, ImageRange, SpecialRegion};
use crate::firmware::{sort_memory_map, MemoryMapEntry, ResourceDescriptor};
use crate::providers::Platform;
use crate::snapshot::{MemoryRegion, PageTableSnapshot};

#[derive(Default)]
pub struct AuditContext {
    page_map: SnapshotBuffer<MemoryRegion>,
    page_map_fetched: bool,
    memory_map: SnapshotBuffer<MemoryMapEntry>,
    memory_map_fetched: bool,
    resource_map: Option<Vec<ResourceDescriptor>>,
    resource_map_fetched: bool,
    special_regions: Option<Vec<SpecialRegion>>,
    non_protected_images: Option<Vec<ImageRange>>,
    exception_lists_fetched: bool,
}

impl AuditContext {
    pub fn new() -> Self {
        Self {
            page_map: SnapshotBuffer::with_granularity(page_elements::<MemoryRegion>()),
            memory_map: SnapshotBuffer::with_granularity(page_elements::<MemoryMapEntry>()),
            ..Self::default()
        }
    }

    /// Captures the flattened page table unless already populated
    pub fn ensure_page_table(&mut self, platform: &dyn Platform) -> Result<(), BufferError> {
        if !self.page_map_fetched {
            self.page_map.acquire(|buf| platform.fill_page_table(buf))?;
            self.page_map_fetched = true;
        }
        Ok(())
    }

    /// Snapshot view over the captured page table
    pub fn page_table(&self) -> PageTableSnapshot<'_> {
        PageTableSnapshot::new(self.page_map.entries())
    }

    /// Captures and sorts the firmware memory map unless already
    /// populated
    pub fn ensure_memory_map(&mut self, platform: &dyn Platform) -> Result<(), BufferError> {
        if !self.memory_map_fetched {
            self.memory_map.acquire(|buf| platform.fill_memory_map(buf))?;
            sort_memory_map(self.memory_map.entries_mut());
            self.memory_map_fetched = true;
        }
        Ok(())
    }

    /// Captured memory map, ascending by physical start
    pub fn memory_map(&self) -> &[MemoryMapEntry] {
        self.memory_map.entries()
    }

    /// Fetches the resource map once; the platform may report none
    pub fn ensure_resource_map(&mut self, platform: &dyn Platform) {
        if !self.resource_map_fetched {
            self.resource_map = platform.resource_map();
            if self.resource_map.is_none() {
                tracing::warn!("platform reported no resource map");
            }
            self.resource_map_fetched = true;
        }
    }

    pub fn resource_map(&self) -> Option<&[ResourceDescriptor]> {
        self.resource_map.as_deref()
    }

    /// Fetches both exception lists once. Either may stay absent for the
    /// whole session, which the matcher distinguishes from empty.
    pub fn ensure_exception_lists(&mut self, platform: &dyn Platform) {
        if !self.exception_lists_fetched {
            self.special_regions = platform.special_regions();
            if self.special_regions.is_none() {
                tracing::debug!("no special region list available");
            }
            self.non_protected_images = platform.non_protected_images();
            if self.non_protected_images.is_none() {
                tracing::debug!("no non-protected image list available");
            }
            self.exception_lists_fetched = true;
        }
    }

    /// Matcher over whatever exception sources this session captured
    pub fn exception_matcher(&self) -> ExceptionMatcher<'_> {
        ExceptionMatcher::new(
            self.special_regions.as_deref(),
            self.non_protected_images.as_deref(),
            self.resource_map.as_deref(),
        )
    }

    /// Drops every capture so the next rule re-acquires fresh state
    pub fn invalidate(&mut self) {
        self.page_map.clear();
        self.page_map_fetched = false;
        self.memory_map.clear();
        self.memory_map_fetched = false;
        self.resource_map = None;
        self.resource_map_fetched = false;
        self.special_regions = None;
        self.non_protected_images = None;
        self.exception_lists_fetched = false;
    }
}

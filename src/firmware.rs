//! Firmware-reported memory and resource maps

use serde::{Deserialize, Serialize};

/// Native page size of the audited platform
pub const PAGE_SIZE: u64 = 0x1000;

/// Allocation granularity required of runtime-services memory
pub const RUNTIME_GRANULARITY: u64 = 0x10000;

/// Firmware memory type of a memory-map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryKind {
    #[default]
    Reserved,
    LoaderCode,
    LoaderData,
    BootServicesCode,
    BootServicesData,
    RuntimeServicesCode,
    RuntimeServicesData,
    Conventional,
    Unusable,
    AcpiReclaim,
    AcpiNvs,
    Mmio,
    MmioPortSpace,
    PalCode,
    Persistent,
}

/// One entry of the firmware memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryMapEntry {
    pub physical_start: u64,
    pub page_count: u64,
    pub kind: MemoryKind,
}

impl MemoryMapEntry {
    pub fn byte_length(&self) -> u64 {
        self.page_count * PAGE_SIZE
    }

    /// Exclusive end of the entry
    pub fn end(&self) -> u64 {
        self.physical_start + self.byte_length()
    }
}

/// Sorts a memory map ascending by physical start. The firmware does not
/// guarantee input order.
pub fn sort_memory_map(entries: &mut [MemoryMapEntry]) {
    entries.sort_unstable_by_key(|entry| entry.physical_start);
}

/// Resource classification of an address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Address range with no resource behind it; accessing it is a bug
    NonExistent,
    Reserved,
    SystemMemory,
    Mmio,
    MmioPortSpace,
    Persistent,
    MoreReliable,
}

/// One entry of the platform resource map. The provider reports the map
/// sorted ascending with gaps represented as `NonExistent` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub base: u64,
    pub length: u64,
    pub kind: ResourceKind,
}

impl ResourceDescriptor {
    /// Exclusive end of the descriptor
    pub fn end(&self) -> u64 {
        self.base + self.length
    }
}

/// Boot processor stack allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootStack {
    pub base: u64,
    pub length: u64,
}

//! Loaded-image descriptors and section alignment policy
//!
//! The capture provider has already walked the PE/COFF headers; what
//! reaches the engine is each image's section alignment and the section
//! ranges with the characteristics the audit cares about.

use crate::firmware::{MemoryKind, PAGE_SIZE, RUNTIME_GRANULARITY};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// PE/COFF section characteristics the audit consumes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SectionFlags: u32 {
        /// Section contains executable code
        const CODE = 0x0000_0020;
        /// Section contains initialized data
        const INITIALIZED_DATA = 0x0000_0040;
        /// Section contains uninitialized data
        const UNINITIALIZED_DATA = 0x0000_0080;
        /// Section can be executed
        const EXECUTABLE = 0x2000_0000;
        /// Section can be written
        const WRITABLE = 0x8000_0000;
    }
}

/// One section of a loaded image, offsets relative to the image base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSection {
    pub virtual_address: u64,
    pub raw_size: u64,
    #[serde(default)]
    pub flags: SectionFlags,
}

/// A loaded PE image with its extracted section ranges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedImage {
    pub base: u64,
    pub size: u64,
    pub name: String,
    pub memory_type: MemoryKind,
    pub section_alignment: u32,
    #[serde(default)]
    pub sections: Vec<ImageSection>,
}

impl LoadedImage {
    /// Exclusive end of the image allocation
    pub fn end(&self) -> u64 {
        self.base + self.size
    }
}

/// Page granularity required of sections in an image declaring
/// `memory_type`.
///
/// Only code memory types (and reserved) are meaningful to query; the
/// data types are a policy error and yield `None`, which callers treat
/// as a misaligned image.
pub fn required_section_alignment(memory_type: MemoryKind) -> Option<u64> {
    match memory_type {
        MemoryKind::RuntimeServicesCode | MemoryKind::AcpiNvs => Some(RUNTIME_GRANULARITY),
        MemoryKind::BootServicesCode | MemoryKind::LoaderCode | MemoryKind::Reserved => {
            Some(PAGE_SIZE)
        }
        MemoryKind::RuntimeServicesData | MemoryKind::AcpiReclaim => {
            debug_assert!(false, "section alignment queried for a data memory type");
            None
        }
        _ => {
            debug_assert!(false, "section alignment queried for an unexpected memory type");
            None
        }
    }
}

/// Whether `section_alignment` satisfies the granularity required by the
/// image's declared memory type
pub fn is_section_aligned(section_alignment: u32, memory_type: MemoryKind) -> bool {
    match required_section_alignment(memory_type) {
        Some(granularity) => (u64::from(section_alignment) & (granularity - 1)) == 0,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_services_code_requires_page_alignment() {
        assert!(is_section_aligned(0x1000, MemoryKind::BootServicesCode));
        assert!(is_section_aligned(0x2000, MemoryKind::LoaderCode));
        assert!(!is_section_aligned(0x200, MemoryKind::BootServicesCode));
    }

    #[test]
    fn test_runtime_code_requires_runtime_granularity() {
        assert!(is_section_aligned(0x10000, MemoryKind::RuntimeServicesCode));
        assert!(!is_section_aligned(0x1000, MemoryKind::RuntimeServicesCode));
        assert!(!is_section_aligned(0x1000, MemoryKind::AcpiNvs));
    }

    #[test]
    fn test_section_flags_match_pe_characteristics() {
        // Values mirror IMAGE_SCN_* so captures can carry raw
        // characteristics.
        assert_eq!(SectionFlags::CODE.bits(), 0x20);
        assert_eq!(SectionFlags::EXECUTABLE.bits(), 0x2000_0000);
        assert_eq!(SectionFlags::WRITABLE.bits(), 0x8000_0000);
    }
}

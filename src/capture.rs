//! Platform captures
//!
//! A capture is a JSON file holding everything the audit consumes: the
//! flattened page table, the firmware memory map, the resource map, the
//! exception lists, the loaded images and the boot-stack record. A
//! loaded capture implements [`Platform`], so the engine replays it
//! exactly as if it were talking to live providers — including the
//! probe/fill sizing protocol.

use crate::exceptions::{ImageRange, SpecialRegion};
use crate::firmware::{BootStack, MemoryMapEntry, ResourceDescriptor};
use crate::image::LoadedImage;
use crate::providers::{Platform, ProbeOutcome};
use crate::snapshot::MemoryRegion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors loading a capture file
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to read capture file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse capture file")]
    Parse(#[from] serde_json::Error),
}

fn default_true() -> bool {
    true
}

/// One captured platform state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCapture {
    /// Flattened page-table regions, ascending by start
    #[serde(default)]
    pub page_table: Vec<MemoryRegion>,

    /// Firmware memory map, any order
    #[serde(default)]
    pub memory_map: Vec<MemoryMapEntry>,

    /// Resource map; null/absent when the platform could not report one
    #[serde(default)]
    pub resources: Option<Vec<ResourceDescriptor>>,

    /// Special-region exception list; null/absent means never populated
    #[serde(default)]
    pub special_regions: Option<Vec<SpecialRegion>>,

    /// Non-protected image list; null/absent means never populated
    #[serde(default)]
    pub non_protected_images: Option<Vec<ImageRange>>,

    #[serde(default)]
    pub images: Vec<LoadedImage>,

    #[serde(default)]
    pub boot_stack: Option<BootStack>,

    /// Whether the platform exposes hardware attribute enforcement
    #[serde(default = "default_true")]
    pub attribute_enforcement: bool,
}

impl Default for PlatformCapture {
    fn default() -> Self {
        Self {
            page_table: Vec::new(),
            memory_map: Vec::new(),
            resources: None,
            special_regions: None,
            non_protected_images: None,
            images: Vec::new(),
            boot_stack: None,
            attribute_enforcement: true,
        }
    }
}

impl PlatformCapture {
    pub fn from_file(path: &Path) -> Result<Self, CaptureError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn from_json(text: &str) -> Result<Self, CaptureError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn fill_slice<T: Clone>(source: &[T], buf: &mut [T]) -> ProbeOutcome {
    if buf.len() < source.len() {
        ProbeOutcome::NeedsCapacity(source.len())
    } else {
        buf[..source.len()].clone_from_slice(source);
        ProbeOutcome::Ready(source.len())
    }
}

impl Platform for PlatformCapture {
    fn fill_page_table(&self, buf: &mut [MemoryRegion]) -> ProbeOutcome {
        fill_slice(&self.page_table, buf)
    }

    fn fill_memory_map(&self, buf: &mut [MemoryMapEntry]) -> ProbeOutcome {
        fill_slice(&self.memory_map, buf)
    }

    fn resource_map(&self) -> Option<Vec<ResourceDescriptor>> {
        self.resources.clone()
    }

    fn special_regions(&self) -> Option<Vec<SpecialRegion>> {
        self.special_regions.clone()
    }

    fn non_protected_images(&self) -> Option<Vec<ImageRange>> {
        self.non_protected_images.clone()
    }

    fn loaded_images(&self) -> Vec<LoadedImage> {
        self.images.clone()
    }

    fn boot_stack(&self) -> Option<BootStack> {
        self.boot_stack
    }

    fn attribute_enforcement(&self) -> bool {
        self.attribute_enforcement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::MemoryAttributes;

    #[test]
    fn test_minimal_capture_parses() {
        let capture = PlatformCapture::from_json("{}").unwrap();
        assert!(capture.page_table.is_empty());
        assert!(capture.resources.is_none());
        assert!(capture.attribute_enforcement);
    }

    #[test]
    fn test_capture_distinguishes_absent_from_empty_lists() {
        let capture =
            PlatformCapture::from_json(r#"{"special_regions": [], "non_protected_images": null}"#)
                .unwrap();
        assert_eq!(capture.special_regions.as_deref(), Some(&[][..]));
        assert!(capture.non_protected_images.is_none());
    }

    #[test]
    fn test_capture_parses_attribute_masks() {
        let text = r#"{
            "page_table": [
                {"start": 4096, "length": 4096, "attributes": "READ_ONLY | EXEC_PROTECT"}
            ]
        }"#;
        let capture = PlatformCapture::from_json(text).unwrap();
        assert_eq!(
            capture.page_table[0].attributes,
            MemoryAttributes::READ_ONLY | MemoryAttributes::EXEC_PROTECT
        );
    }

    #[test]
    fn test_fill_follows_probe_protocol() {
        let capture = PlatformCapture {
            page_table: vec![MemoryRegion::new(0, 0x1000, MemoryAttributes::empty())],
            ..PlatformCapture::default()
        };

        assert_eq!(
            capture.fill_page_table(&mut []),
            ProbeOutcome::NeedsCapacity(1)
        );
        let mut buf = vec![MemoryRegion::default(); 2];
        assert_eq!(capture.fill_page_table(&mut buf), ProbeOutcome::Ready(1));
        assert_eq!(buf[0].length, 0x1000);
    }
}

//! Read/write/execute exception sources
//!
//! A region flagged read/write/execute is only a violation when no
//! exception source subsumes it. An entry must fully contain the query
//! region; mere overlap never exempts.

use crate::attributes::MemoryAttributes;
use crate::firmware::{ResourceDescriptor, ResourceKind};
use crate::interval::subsumes;
use serde::{Deserialize, Serialize};

/// Platform-declared special region. Exempts only while the platform
/// has not reapplied protections to it, i.e. its attribute mask is
/// empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRegion {
    pub start: u64,
    pub length: u64,
    #[serde(default)]
    pub attributes: MemoryAttributes,
}

/// Image range loaded without memory protection applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRange {
    pub base: u64,
    pub length: u64,
}

/// Allow-list matcher over the three exception sources
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionMatcher<'a> {
    special_regions: Option<&'a [SpecialRegion]>,
    non_protected_images: Option<&'a [ImageRange]>,
    resource_map: Option<&'a [ResourceDescriptor]>,
}

impl<'a> ExceptionMatcher<'a> {
    /// Each source is independently optional; `None` means the source was
    /// never populated this session, which is not the same as an empty
    /// list.
    pub fn new(
        special_regions: Option<&'a [SpecialRegion]>,
        non_protected_images: Option<&'a [ImageRange]>,
        resource_map: Option<&'a [ResourceDescriptor]>,
    ) -> Self {
        Self {
            special_regions,
            non_protected_images,
            resource_map,
        }
    }

    /// Whether `[address, address + length)` is allowed to be
    /// read/write/execute.
    ///
    /// When neither the special-region list nor the non-protected-image
    /// list was ever populated, the query is denied outright without
    /// consulting the resource map.
    pub fn is_exempt(&self, address: u64, length: u64) -> bool {
        if self.special_regions.is_none() && self.non_protected_images.is_none() {
            return false;
        }

        let end = address.saturating_add(length);

        if let Some(regions) = self.special_regions {
            for region in regions {
                if subsumes(region.start, region.start + region.length, address, end)
                    && region.attributes.is_empty()
                {
                    return true;
                }
            }
        }

        if let Some(images) = self.non_protected_images {
            for image in images {
                if subsumes(image.base, image.base + image.length, address, end) {
                    return true;
                }
            }
        }

        if let Some(resources) = self.resource_map {
            for descriptor in resources {
                if subsumes(descriptor.base, descriptor.end(), address, end)
                    && descriptor.kind == ResourceKind::NonExistent
                {
                    return true;
                }
            }
        }

        false
    }
}

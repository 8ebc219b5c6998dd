//! Hardware-enforced memory attribute masks
//!
//! Attributes follow the firmware convention of naming the protection
//! rather than the permission: a mapped region with an empty mask is
//! readable, writable and executable. Absence from the page-table
//! snapshot is what "not present" means.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Protection attributes applied to a mapped region
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MemoryAttributes: u64 {
        /// Region cannot be read
        const READ_PROTECT = 1 << 0;
        /// Region cannot be written
        const READ_ONLY = 1 << 1;
        /// Region cannot be executed
        const EXEC_PROTECT = 1 << 2;
    }
}

impl MemoryAttributes {
    /// True when no protection bit limits the region, i.e. it is
    /// simultaneously readable, writable and executable.
    pub fn is_read_write_execute(self) -> bool {
        !self.intersects(Self::READ_PROTECT | Self::READ_ONLY | Self::EXEC_PROTECT)
    }

    /// Names of the attribute bits set in this mask, for report records
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

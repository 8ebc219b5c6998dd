//! Snapshot dumps
//!
//! Writes the audit's view of the platform to plain-text `.dat` files
//! for offline inspection, one file per snapshot.

use crate::context::AuditContext;
use crate::providers::Platform;
use anyhow::{Context as _, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Dumps every captured snapshot under `dir`.
///
/// Produces `PageTable.dat`, `MemoryMap.dat`, `Resources.dat` and
/// `LoadedImages.dat`.
pub fn dump_snapshots(ctx: &mut AuditContext, platform: &dyn Platform, dir: &Path) -> Result<()> {
    ctx.ensure_page_table(platform)?;
    ctx.ensure_memory_map(platform)?;
    ctx.ensure_resource_map(platform);

    let mut page_table = String::new();
    for region in ctx.page_table().regions() {
        let _ = writeln!(
            page_table,
            "{:#x},{:#x},{}",
            region.start,
            region.end(),
            region.attributes.names().join("|")
        );
    }
    write_dump(dir, "PageTable.dat", &page_table)?;

    let mut memory_map = String::new();
    for entry in ctx.memory_map() {
        let _ = writeln!(
            memory_map,
            "{:#x},{:#x},{:?}",
            entry.physical_start,
            entry.end(),
            entry.kind
        );
    }
    write_dump(dir, "MemoryMap.dat", &memory_map)?;

    let mut resources = String::new();
    for descriptor in ctx.resource_map().unwrap_or_default() {
        let _ = writeln!(
            resources,
            "{:#x},{:#x},{:?}",
            descriptor.base,
            descriptor.end(),
            descriptor.kind
        );
    }
    write_dump(dir, "Resources.dat", &resources)?;

    let mut images = String::new();
    for image in platform.loaded_images() {
        let _ = writeln!(
            images,
            "{},{:#x},{:#x}",
            image.name,
            image.base,
            image.end()
        );
        for section in &image.sections {
            let _ = writeln!(
                images,
                "  {:#x},{:#x},{:#x}",
                image.base + section.virtual_address,
                section.raw_size,
                section.flags.bits()
            );
        }
    }
    write_dump(dir, "LoadedImages.dat", &images)?;

    Ok(())
}

fn write_dump(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

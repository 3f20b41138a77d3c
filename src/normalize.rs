use std::collections::BTreeSet;

use crate::dataset::{Dataset, DeviceEntry, OsEntry, VendorEntry};

/// Make every channel carry the same keys.
///
/// Any OS, OS version, graphics vendor or device that appears in one
/// channel is inserted into every other channel with a zero count. Existing
/// counts are left untouched, so running this twice is a no-op.
pub fn normalize(ds: &mut Dataset) {
    normalize_platforms(ds);
    normalize_graphics(ds);
}

fn normalize_platforms(ds: &mut Dataset) {
    let mut seen: BTreeSet<(String, Option<String>)> = BTreeSet::new();
    for slice in ds.platforms.values() {
        for (os, entry) in &slice.oses {
            seen.insert((os.clone(), None));
            for version in entry.versions.keys() {
                seen.insert((os.clone(), Some(version.clone())));
            }
        }
    }

    let mut added = 0usize;
    for slice in ds.platforms.values_mut() {
        for (os, version) in &seen {
            let entry = slice.oses.entry(os.clone()).or_insert_with(|| {
                added += 1;
                OsEntry::default()
            });
            if let Some(version) = version {
                entry.versions.entry(version.clone()).or_insert_with(|| {
                    added += 1;
                    0.0
                });
            }
        }
    }
    if added > 0 {
        tracing::debug!(added, "filled missing platform keys");
    }
}

fn normalize_graphics(ds: &mut Dataset) {
    let mut seen: BTreeSet<(String, Option<String>)> = BTreeSet::new();
    for slice in ds.graphics.values() {
        for (vendor, entry) in &slice.gfxs {
            seen.insert((vendor.clone(), None));
            for device in entry.devices.keys() {
                seen.insert((vendor.clone(), Some(device.clone())));
            }
        }
    }

    let mut added = 0usize;
    for slice in ds.graphics.values_mut() {
        for (vendor, device) in &seen {
            let entry = slice.gfxs.entry(vendor.clone()).or_insert_with(|| {
                added += 1;
                VendorEntry::default()
            });
            if let Some(device) = device {
                entry.devices.entry(device.clone()).or_insert_with(|| {
                    added += 1;
                    DeviceEntry::default()
                });
            }
        }
    }
    if added > 0 {
        tracing::debug!(added, "filled missing graphics keys");
    }
}

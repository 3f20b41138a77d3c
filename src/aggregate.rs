use std::cmp::Ordering;

use crate::dataset::{Dataset, BETA, RELEASE};

/// Which population total a percentage is taken against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Platforms,
    Graphics,
}

/// Channel total for a section, 0 when the channel is absent.
pub fn channel_total(ds: &Dataset, section: Section, channel: &str) -> f64 {
    match section {
        Section::Platforms => ds.platform(channel).map(|p| p.total).unwrap_or(0.0),
        Section::Graphics => ds.graphics(channel).map(|g| g.total).unwrap_or(0.0),
    }
}

/// Sort `(name, count)` pairs by descending count, ties by name.
fn by_count_desc(mut pairs: Vec<(String, f64)>) -> Vec<String> {
    pairs.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    pairs.into_iter().map(|(name, _)| name).collect()
}

// ─── NAME LISTINGS ──────────────────────────────────────────────

pub fn os_names(ds: &Dataset, channel: &str, sort: bool) -> Vec<String> {
    let Some(slice) = ds.platform(channel) else {
        return Vec::new();
    };
    if sort {
        by_count_desc(slice.oses.iter().map(|(k, v)| (k.clone(), v.total)).collect())
    } else {
        slice.oses.keys().cloned().collect()
    }
}

pub fn os_version_names(ds: &Dataset, channel: &str, os: &str, sort: bool) -> Vec<String> {
    let Some(entry) = ds.platform(channel).and_then(|p| p.oses.get(os)) else {
        return Vec::new();
    };
    if sort {
        by_count_desc(entry.versions.iter().map(|(k, v)| (k.clone(), *v)).collect())
    } else {
        entry.versions.keys().cloned().collect()
    }
}

pub fn vendor_names(ds: &Dataset, channel: &str, sort: bool) -> Vec<String> {
    let Some(slice) = ds.graphics(channel) else {
        return Vec::new();
    };
    if sort {
        by_count_desc(slice.gfxs.iter().map(|(k, v)| (k.clone(), v.total)).collect())
    } else {
        slice.gfxs.keys().cloned().collect()
    }
}

pub fn device_names(ds: &Dataset, channel: &str, vendor: &str, sort: bool) -> Vec<String> {
    let Some(entry) = ds.graphics(channel).and_then(|g| g.gfxs.get(vendor)) else {
        return Vec::new();
    };
    if sort {
        by_count_desc(entry.devices.iter().map(|(k, v)| (k.clone(), v.total)).collect())
    } else {
        entry.devices.keys().cloned().collect()
    }
}

// ─── COUNT LOOKUPS ──────────────────────────────────────────────
// One value per requested name, in request order. Unknown names count as 0
// so the release and beta arrays always line up.

pub fn users_for_oses(ds: &Dataset, channel: &str, names: &[String]) -> Vec<f64> {
    let oses = ds.platform(channel).map(|p| &p.oses);
    names
        .iter()
        .map(|n| oses.and_then(|o| o.get(n)).map(|e| e.total).unwrap_or(0.0))
        .collect()
}

pub fn users_for_os_versions(ds: &Dataset, channel: &str, os: &str, names: &[String]) -> Vec<f64> {
    let versions = ds.platform(channel).and_then(|p| p.oses.get(os)).map(|e| &e.versions);
    names
        .iter()
        .map(|n| versions.and_then(|v| v.get(n)).copied().unwrap_or(0.0))
        .collect()
}

pub fn users_for_vendors(ds: &Dataset, channel: &str, names: &[String]) -> Vec<f64> {
    let gfxs = ds.graphics(channel).map(|g| &g.gfxs);
    names
        .iter()
        .map(|n| gfxs.and_then(|g| g.get(n)).map(|e| e.total).unwrap_or(0.0))
        .collect()
}

pub fn users_for_devices(ds: &Dataset, channel: &str, vendor: &str, names: &[String]) -> Vec<f64> {
    let devices = ds.graphics(channel).and_then(|g| g.gfxs.get(vendor)).map(|e| &e.devices);
    names
        .iter()
        .map(|n| devices.and_then(|d| d.get(n)).map(|e| e.total).unwrap_or(0.0))
        .collect()
}

/// `round(100 * count / total, 1)` for each count, halves to even.
/// A zero total gives zeros.
pub fn percentages(counts: &[f64], total: f64) -> Vec<f32> {
    counts
        .iter()
        .map(|&c| {
            if total > 0.0 {
                ((1000.0 * c / total).round_ties_even() / 10.0) as f32
            } else {
                0.0
            }
        })
        .collect()
}

// ─── COMPARISON ─────────────────────────────────────────────────

/// Release vs beta share for a list of categories, ready to plot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub labels: Vec<String>,
    pub release: Vec<f32>,
    pub beta: Vec<f32>,
    /// Largest value across both series, used as the y-axis end.
    pub y_max: f32,
}

impl Comparison {
    pub fn new(
        labels: Vec<String>,
        release_counts: &[f64],
        release_total: f64,
        beta_counts: &[f64],
        beta_total: f64,
    ) -> Self {
        let release = percentages(release_counts, release_total);
        let beta = percentages(beta_counts, beta_total);
        let y_max = release.iter().chain(beta.iter()).cloned().fold(0.0_f32, f32::max);
        Self { labels, release, beta, y_max }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("category,release_pct,beta_pct\n");
        for (i, label) in self.labels.iter().enumerate() {
            let r = self.release.get(i).copied().unwrap_or(0.0);
            let b = self.beta.get(i).copied().unwrap_or(0.0);
            out.push_str(&format!("\"{}\",{:.1},{:.1}\n", label.replace('"', "\"\""), r, b));
        }
        out
    }
}

pub fn compare_oses(ds: &Dataset, names: Vec<String>) -> Comparison {
    Comparison::new(
        names.clone(),
        &users_for_oses(ds, RELEASE, &names),
        channel_total(ds, Section::Platforms, RELEASE),
        &users_for_oses(ds, BETA, &names),
        channel_total(ds, Section::Platforms, BETA),
    )
}

pub fn compare_os_versions(ds: &Dataset, os: &str, names: Vec<String>) -> Comparison {
    Comparison::new(
        names.clone(),
        &users_for_os_versions(ds, RELEASE, os, &names),
        channel_total(ds, Section::Platforms, RELEASE),
        &users_for_os_versions(ds, BETA, os, &names),
        channel_total(ds, Section::Platforms, BETA),
    )
}

pub fn compare_vendors(ds: &Dataset, names: Vec<String>) -> Comparison {
    Comparison::new(
        names.clone(),
        &users_for_vendors(ds, RELEASE, &names),
        channel_total(ds, Section::Graphics, RELEASE),
        &users_for_vendors(ds, BETA, &names),
        channel_total(ds, Section::Graphics, BETA),
    )
}

pub fn compare_devices(ds: &Dataset, vendor: &str, names: Vec<String>) -> Comparison {
    Comparison::new(
        names.clone(),
        &users_for_devices(ds, RELEASE, vendor, &names),
        channel_total(ds, Section::Graphics, RELEASE),
        &users_for_devices(ds, BETA, vendor, &names),
        channel_total(ds, Section::Graphics, BETA),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::normalized_sample;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_percentages_rounding() {
        let pct = percentages(&[1.0, 2.0, 333.0], 1000.0);
        assert_eq!(pct, vec![0.1, 0.2, 33.3]);
        assert_eq!(percentages(&[1.0, 2.0], 3.0), vec![33.3, 66.7]);
    }

    #[test]
    fn test_percentages_half_to_even() {
        assert_eq!(percentages(&[1.0, 5.0], 400.0), vec![0.2, 1.2]);
        assert_eq!(percentages(&[3.0], 400.0), vec![0.8]);
    }

    #[test]
    fn test_percentages_zero_total() {
        assert_eq!(percentages(&[5.0, 7.0], 0.0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sorted_os_names() {
        let ds = normalized_sample();
        assert_eq!(os_names(&ds, RELEASE, true), names(&["Windows", "Linux", "Darwin"]));
        assert_eq!(os_names(&ds, RELEASE, false), names(&["Darwin", "Linux", "Windows"]));
    }

    #[test]
    fn test_sorted_version_names_ties_by_name() {
        let ds = normalized_sample();
        // "11" is a zero-count key filled in by normalization.
        assert_eq!(
            os_version_names(&ds, RELEASE, "Windows", true),
            names(&["10", "7", "8.1", "11"])
        );
        assert!(os_version_names(&ds, RELEASE, "BeOS", true).is_empty());
    }

    #[test]
    fn test_vendor_and_device_names() {
        let ds = normalized_sample();
        assert_eq!(
            vendor_names(&ds, RELEASE, true),
            names(&[
                "NVIDIA Corporation",
                "Advanced Micro Devices, Inc. [AMD/ATI]",
                "Intel Corporation",
                "VMware",
            ])
        );
        assert_eq!(
            device_names(&ds, RELEASE, "NVIDIA Corporation", true),
            names(&["GeForce RTX 3060", "GeForce GTX 1060", "GeForce RTX 4090"])
        );
    }

    #[test]
    fn test_counts_follow_request_order() {
        let ds = normalized_sample();
        let req = names(&["Darwin", "Windows", "Plan 9"]);
        assert_eq!(users_for_oses(&ds, RELEASE, &req), vec![100.0, 700.0, 0.0]);
        assert_eq!(users_for_oses(&ds, BETA, &req), vec![50.0, 300.0, 0.0]);
    }

    #[test]
    fn test_compare_vendors() {
        let ds = normalized_sample();
        let cmp = compare_vendors(
            &ds,
            names(&["NVIDIA Corporation", "Advanced Micro Devices, Inc. [AMD/ATI]"]),
        );
        assert_eq!(cmp.release, vec![50.0, 30.0]);
        assert_eq!(cmp.beta, vec![50.0, 0.0]);
        assert_eq!(cmp.y_max, 50.0);
    }

    #[test]
    fn test_compare_devices_uses_graphics_total() {
        let ds = normalized_sample();
        let cmp = compare_devices(&ds, "Intel Corporation", names(&["UHD Graphics 620", "Iris Xe"]));
        assert_eq!(cmp.release, vec![20.0, 0.0]);
        assert_eq!(cmp.beta, vec![25.0, 12.5]);
        assert_eq!(cmp.y_max, 25.0);
    }

    #[test]
    fn test_compare_os_versions_uses_platform_total() {
        let ds = normalized_sample();
        let cmp = compare_os_versions(&ds, "Windows", names(&["10", "11"]));
        assert_eq!(cmp.release, vec![40.0, 0.0]);
        assert_eq!(cmp.beta, vec![40.0, 20.0]);
    }

    #[test]
    fn test_empty_selection() {
        let ds = normalized_sample();
        let cmp = compare_oses(&ds, Vec::new());
        assert!(cmp.is_empty());
        assert_eq!(cmp.y_max, 0.0);
    }

    #[test]
    fn test_csv_export() {
        let ds = normalized_sample();
        let cmp = compare_vendors(&ds, names(&["Advanced Micro Devices, Inc. [AMD/ATI]"]));
        let csv = cmp.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "category,release_pct,beta_pct");
        assert_eq!(lines[1], "\"Advanced Micro Devices, Inc. [AMD/ATI]\",30.0,0.0");
    }
}

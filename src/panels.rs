//! Widget state behind the four comparison panels.
//!
//! Each panel owns its selection and the derived [`Comparison`]; every
//! interaction goes through a method that recomputes the comparison from
//! the dataset, so the chart never shows stale numbers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::aggregate::{
    compare_devices, compare_os_versions, compare_oses, compare_vendors, device_names,
    os_names, os_version_names, vendor_names, Comparison,
};
use crate::dataset::{Dataset, RELEASE};

/// Vendors selected when none of the preferred ones exist.
const FALLBACK_VENDOR_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Oses,
    OsVersions,
    Vendors,
    Devices,
}

impl Tab {
    pub const ALL: &[Tab] = &[Tab::Oses, Tab::OsVersions, Tab::Vendors, Tab::Devices];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Oses => "OS Comparison",
            Tab::OsVersions => "OS Version Comparison",
            Tab::Vendors => "GFX Vendor Comparison",
            Tab::Devices => "GFX Device Comparison",
        }
    }

    /// Chart heading.
    pub fn chart_title(&self) -> &'static str {
        match self {
            Tab::Oses => "OS",
            Tab::OsVersions => "OS Versions",
            Tab::Vendors => "GFX Vendors",
            Tab::Devices => "GFX Devices",
        }
    }

    pub fn next(self) -> Tab {
        match self {
            Tab::Oses => Tab::OsVersions,
            Tab::OsVersions => Tab::Vendors,
            Tab::Vendors => Tab::Devices,
            Tab::Devices => Tab::Oses,
        }
    }

    pub fn prev(self) -> Tab {
        match self {
            Tab::Oses => Tab::Devices,
            Tab::OsVersions => Tab::Oses,
            Tab::Vendors => Tab::OsVersions,
            Tab::Devices => Tab::Vendors,
        }
    }
}

// ─── CHECKLIST ──────────────────────────────────────────────────

/// A checkbox group: ordered labels plus the checked subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckList {
    labels: Vec<String>,
    checked: HashSet<String>,
}

impl CheckList {
    /// Only names that are also labels end up checked.
    pub fn new(labels: Vec<String>, checked: impl IntoIterator<Item = String>) -> Self {
        let known: HashSet<&String> = labels.iter().collect();
        let checked = checked.into_iter().filter(|c| known.contains(c)).collect();
        Self { labels, checked }
    }

    pub fn all(labels: Vec<String>) -> Self {
        let checked = labels.iter().cloned().collect();
        Self { labels, checked }
    }

    /// Check the first `n` labels.
    pub fn first(labels: Vec<String>, n: usize) -> Self {
        let checked = labels.iter().take(n).cloned().collect();
        Self { labels, checked }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_checked(&self, label: &str) -> bool {
        self.checked.contains(label)
    }

    pub fn set(&mut self, label: &str, on: bool) {
        if on {
            if self.labels.iter().any(|l| l == label) {
                self.checked.insert(label.to_string());
            }
        } else {
            self.checked.remove(label);
        }
    }

    pub fn set_all(&mut self, on: bool) {
        if on {
            self.checked = self.labels.iter().cloned().collect();
        } else {
            self.checked.clear();
        }
    }

    /// Checked labels in label order.
    pub fn checked(&self) -> Vec<String> {
        self.labels.iter().filter(|l| self.checked.contains(*l)).cloned().collect()
    }
}

// ─── PANELS ─────────────────────────────────────────────────────

/// Common surface the shell drives for every panel.
pub trait Panel {
    fn list(&self) -> &CheckList;
    fn list_mut(&mut self) -> &mut CheckList;
    fn comparison(&self) -> &Comparison;
    /// Recompute the comparison from the current selection.
    fn refresh(&mut self, ds: &Dataset);

    fn toggle(&mut self, ds: &Dataset, label: &str, on: bool) {
        self.list_mut().set(label, on);
        self.refresh(ds);
    }

    fn set_all(&mut self, ds: &Dataset, on: bool) {
        self.list_mut().set_all(on);
        self.refresh(ds);
    }
}

#[derive(Debug, Clone, Default)]
pub struct OsPanel {
    list: CheckList,
    comparison: Comparison,
}

impl OsPanel {
    pub fn new(ds: &Dataset) -> Self {
        let mut panel = Self {
            list: CheckList::all(os_names(ds, RELEASE, true)),
            comparison: Comparison::default(),
        };
        panel.refresh(ds);
        panel
    }
}

impl Panel for OsPanel {
    fn list(&self) -> &CheckList { &self.list }
    fn list_mut(&mut self) -> &mut CheckList { &mut self.list }
    fn comparison(&self) -> &Comparison { &self.comparison }

    fn refresh(&mut self, ds: &Dataset) {
        self.comparison = compare_oses(ds, self.list.checked());
    }
}

#[derive(Debug, Clone, Default)]
pub struct OsVersionPanel {
    oses: Vec<String>,
    os: Option<String>,
    list: CheckList,
    comparison: Comparison,
    reset_count: usize,
}

impl OsVersionPanel {
    pub fn new(ds: &Dataset, reset_count: usize) -> Self {
        let oses = os_names(ds, RELEASE, true);
        let first = oses.first().cloned();
        let mut panel = Self {
            oses,
            os: None,
            list: CheckList::default(),
            comparison: Comparison::default(),
            reset_count,
        };
        if let Some(os) = first {
            panel.select_os(ds, &os);
        }
        panel
    }

    pub fn oses(&self) -> &[String] {
        &self.oses
    }

    pub fn os(&self) -> Option<&String> {
        self.os.as_ref()
    }

    /// Switch OS; the selection resets to its most common versions.
    pub fn select_os(&mut self, ds: &Dataset, os: &str) {
        if !self.oses.iter().any(|o| o == os) {
            return;
        }
        self.os = Some(os.to_string());
        self.list = CheckList::first(os_version_names(ds, RELEASE, os, true), self.reset_count);
        self.refresh(ds);
    }
}

impl Panel for OsVersionPanel {
    fn list(&self) -> &CheckList { &self.list }
    fn list_mut(&mut self) -> &mut CheckList { &mut self.list }
    fn comparison(&self) -> &Comparison { &self.comparison }

    fn refresh(&mut self, ds: &Dataset) {
        self.comparison = match &self.os {
            Some(os) => compare_os_versions(ds, os, self.list.checked()),
            None => Comparison::default(),
        };
    }
}

#[derive(Debug, Clone, Default)]
pub struct VendorPanel {
    list: CheckList,
    comparison: Comparison,
}

impl VendorPanel {
    pub fn new(ds: &Dataset, preferred: &[String]) -> Self {
        let labels = vendor_names(ds, RELEASE, true);
        let mut list = CheckList::new(labels.clone(), preferred.iter().cloned());
        if list.checked().is_empty() {
            list = CheckList::first(labels, FALLBACK_VENDOR_COUNT);
        }
        let mut panel = Self { list, comparison: Comparison::default() };
        panel.refresh(ds);
        panel
    }
}

impl Panel for VendorPanel {
    fn list(&self) -> &CheckList { &self.list }
    fn list_mut(&mut self) -> &mut CheckList { &mut self.list }
    fn comparison(&self) -> &Comparison { &self.comparison }

    fn refresh(&mut self, ds: &Dataset) {
        self.comparison = compare_vendors(ds, self.list.checked());
    }
}

#[derive(Debug, Clone, Default)]
pub struct DevicePanel {
    vendors: Vec<String>,
    vendor: Option<String>,
    list: CheckList,
    comparison: Comparison,
    reset_count: usize,
}

impl DevicePanel {
    pub fn new(ds: &Dataset, reset_count: usize) -> Self {
        let vendors = vendor_names(ds, RELEASE, true);
        let first = vendors.first().cloned();
        let mut panel = Self {
            vendors,
            vendor: None,
            list: CheckList::default(),
            comparison: Comparison::default(),
            reset_count,
        };
        if let Some(vendor) = first {
            panel.select_vendor(ds, &vendor);
        }
        panel
    }

    pub fn vendors(&self) -> &[String] {
        &self.vendors
    }

    pub fn vendor(&self) -> Option<&String> {
        self.vendor.as_ref()
    }

    /// Switch vendor; the selection resets to its most common devices.
    pub fn select_vendor(&mut self, ds: &Dataset, vendor: &str) {
        if !self.vendors.iter().any(|v| v == vendor) {
            return;
        }
        self.vendor = Some(vendor.to_string());
        self.list = CheckList::first(device_names(ds, RELEASE, vendor, true), self.reset_count);
        self.refresh(ds);
    }
}

impl Panel for DevicePanel {
    fn list(&self) -> &CheckList { &self.list }
    fn list_mut(&mut self) -> &mut CheckList { &mut self.list }
    fn comparison(&self) -> &Comparison { &self.comparison }

    fn refresh(&mut self, ds: &Dataset) {
        self.comparison = match &self.vendor {
            Some(vendor) => compare_devices(ds, vendor, self.list.checked()),
            None => Comparison::default(),
        };
    }
}

/// All four panels, built once per loaded dataset.
#[derive(Debug, Clone, Default)]
pub struct Panels {
    pub oses: OsPanel,
    pub os_versions: OsVersionPanel,
    pub vendors: VendorPanel,
    pub devices: DevicePanel,
}

impl Panels {
    pub fn new(ds: &Dataset, preferred_vendors: &[String], reset_count: usize) -> Self {
        Self {
            oses: OsPanel::new(ds),
            os_versions: OsVersionPanel::new(ds, reset_count),
            vendors: VendorPanel::new(ds, preferred_vendors),
            devices: DevicePanel::new(ds, reset_count),
        }
    }

    pub fn get(&self, tab: Tab) -> &dyn Panel {
        match tab {
            Tab::Oses => &self.oses,
            Tab::OsVersions => &self.os_versions,
            Tab::Vendors => &self.vendors,
            Tab::Devices => &self.devices,
        }
    }

    pub fn get_mut(&mut self, tab: Tab) -> &mut dyn Panel {
        match tab {
            Tab::Oses => &mut self.oses,
            Tab::OsVersions => &mut self.os_versions,
            Tab::Vendors => &mut self.vendors,
            Tab::Devices => &mut self.devices,
        }
    }
}

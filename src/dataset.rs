use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::loader::LoadError;

pub const RELEASE: &str = "release";
pub const BETA: &str = "beta";

/// Channels every dataset must carry in both sections.
pub const REQUIRED_CHANNELS: &[&str] = &[RELEASE, BETA];

/// Aggregated telemetry, keyed by channel ("release", "beta", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformSlice>,
    #[serde(default)]
    pub graphics: BTreeMap<String, GraphicsSlice>,
}

/// Operating system breakdown for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformSlice {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub oses: BTreeMap<String, OsEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsEntry {
    #[serde(default)]
    pub total: f64,
    /// OS version name → user count.
    #[serde(default)]
    pub versions: BTreeMap<String, f64>,
}

/// Graphics vendor breakdown for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphicsSlice {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub gfxs: BTreeMap<String, VendorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorEntry {
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub total: f64,
    /// Driver version → user count.
    #[serde(default)]
    pub versions: BTreeMap<String, f64>,
}

/// Population totals shown in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub release_users: f64,
    pub beta_users: f64,
    pub release_gfx_users: f64,
    pub beta_gfx_users: f64,
}

impl Dataset {
    pub fn from_json(contents: &str) -> Result<Self, LoadError> {
        let ds: Dataset = serde_json::from_str(contents)?;
        Ok(ds)
    }

    /// Channel names present in the platform section.
    pub fn channels(&self) -> Vec<String> {
        self.platforms.keys().cloned().collect()
    }

    pub fn platform(&self, channel: &str) -> Option<&PlatformSlice> {
        self.platforms.get(channel)
    }

    pub fn graphics(&self, channel: &str) -> Option<&GraphicsSlice> {
        self.graphics.get(channel)
    }

    /// Both sections must carry the release and beta channels.
    pub fn validate(&self) -> Result<(), LoadError> {
        for &channel in REQUIRED_CHANNELS {
            if !self.platforms.contains_key(channel) {
                return Err(LoadError::MissingChannel {
                    section: "platforms",
                    channel: channel.to_string(),
                });
            }
            if !self.graphics.contains_key(channel) {
                return Err(LoadError::MissingChannel {
                    section: "graphics",
                    channel: channel.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let platform_total = |ch: &str| self.platform(ch).map(|p| p.total).unwrap_or(0.0);
        let gfx_total = |ch: &str| self.graphics(ch).map(|g| g.total).unwrap_or(0.0);
        Summary {
            release_users: platform_total(RELEASE),
            beta_users: platform_total(BETA),
            release_gfx_users: gfx_total(RELEASE),
            beta_gfx_users: gfx_total(BETA),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Dataset;

    /// Small dataset with deliberately asymmetric keys between channels.
    pub const SAMPLE_JSON: &str = r#"{
      "platforms": {
        "release": {
          "total": 1000,
          "oses": {
            "Windows": { "total": 700, "versions": { "10": 400, "7": 250, "8.1": 50 } },
            "Linux":   { "total": 200, "versions": { "Ubuntu 22.04": 120, "Fedora 38": 80 } },
            "Darwin":  { "total": 100, "versions": { "14.0": 100 } }
          }
        },
        "beta": {
          "total": 500,
          "oses": {
            "Windows": { "total": 300, "versions": { "10": 200, "11": 100 } },
            "Linux":   { "total": 150, "versions": { "Ubuntu 22.04": 100, "Arch": 50 } },
            "Darwin":  { "total": 50,  "versions": { "14.0": 50 } }
          }
        }
      },
      "graphics": {
        "release": {
          "total": 1000,
          "gfxs": {
            "NVIDIA Corporation": {
              "total": 500,
              "devices": {
                "GeForce RTX 3060": { "total": 300, "versions": { "535": 300 } },
                "GeForce GTX 1060": { "total": 200, "versions": { "470": 200 } }
              }
            },
            "Advanced Micro Devices, Inc. [AMD/ATI]": {
              "total": 300,
              "devices": { "Radeon RX 580": { "total": 300 } }
            },
            "Intel Corporation": {
              "total": 200,
              "devices": { "UHD Graphics 620": { "total": 200 } }
            }
          }
        },
        "beta": {
          "total": 400,
          "gfxs": {
            "NVIDIA Corporation": {
              "total": 200,
              "devices": {
                "GeForce RTX 3060": { "total": 120 },
                "GeForce RTX 4090": { "total": 80 }
              }
            },
            "Intel Corporation": {
              "total": 150,
              "devices": {
                "UHD Graphics 620": { "total": 100 },
                "Iris Xe": { "total": 50 }
              }
            },
            "VMware": {
              "total": 50,
              "devices": { "SVGA II": { "total": 50 } }
            }
          }
        }
      }
    }"#;

    pub fn sample() -> Dataset {
        Dataset::from_json(SAMPLE_JSON).unwrap()
    }

    pub fn normalized_sample() -> Dataset {
        let mut ds = sample();
        crate::normalize::normalize(&mut ds);
        ds
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_sample() {
        let ds = sample();
        assert_eq!(ds.channels(), vec!["beta".to_string(), "release".to_string()]);
        let release = ds.platform(RELEASE).unwrap();
        assert_eq!(release.total, 1000.0);
        assert_eq!(release.oses["Windows"].versions["7"], 250.0);
        let amd = &ds.graphics(RELEASE).unwrap().gfxs["Advanced Micro Devices, Inc. [AMD/ATI]"];
        // Missing "versions" on a device defaults to empty.
        assert!(amd.devices["Radeon RX 580"].versions.is_empty());
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_beta_graphics() {
        let mut ds = sample();
        ds.graphics.remove(BETA);
        match ds.validate() {
            Err(LoadError::MissingChannel { section, channel }) => {
                assert_eq!(section, "graphics");
                assert_eq!(channel, "beta");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(Dataset::from_json("{ not json"), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_summary() {
        let s = sample().summary();
        assert_eq!(s.release_users, 1000.0);
        assert_eq!(s.beta_users, 500.0);
        assert_eq!(s.beta_gfx_users, 400.0);
    }

    #[test]
    fn test_empty_object_parses() {
        let ds = Dataset::from_json("{}").unwrap();
        assert!(ds.platforms.is_empty());
        assert!(ds.validate().is_err());
    }
}

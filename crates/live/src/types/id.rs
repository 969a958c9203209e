use serde::{Deserialize, Serialize};

/// One execution of a feature, as announced by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RunId(u64);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FeatureId(u64);

impl RunId {
  pub fn new(id: u64) -> Self {
    RunId(id)
  }

  pub fn inner(&self) -> u64 {
    self.0
  }
}

impl FeatureId {
  pub fn new(id: u64) -> Self {
    FeatureId(id)
  }

  pub fn inner(&self) -> u64 {
    self.0
  }
}

impl ToString for RunId {
  fn to_string(&self) -> String {
    self.0.to_string()
  }
}

impl ToString for FeatureId {
  fn to_string(&self) -> String {
    self.0.to_string()
  }
}

/// Composite key for one (run, browser configuration) pair. The backend fans
/// a run out across browser/OS/device targets; each target reports steps
/// independently under this key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BrowserKey {
  pub browser: String,
  pub browser_version: String,
  pub os: String,
  pub os_version: String,
  pub device: Option<String>,
}

impl BrowserKey {
  pub fn new(
    browser: impl Into<String>,
    browser_version: impl Into<String>,
    os: impl Into<String>,
    os_version: impl Into<String>,
  ) -> Self {
    BrowserKey {
      browser: browser.into(),
      browser_version: browser_version.into(),
      os: os.into(),
      os_version: os_version.into(),
      device: None,
    }
  }

  pub fn with_device(mut self, device: impl Into<String>) -> Self {
    self.device = Some(device.into());
    self
  }

  /// Canonical `browser-version-os-osversion[-device]` form, used for log
  /// messages and UI labels.
  pub fn slug(&self) -> String {
    let mut parts = vec![
      self.browser.as_str(),
      self.browser_version.as_str(),
      self.os.as_str(),
      self.os_version.as_str(),
    ];

    if let Some(device) = &self.device {
      parts.push(device.as_str());
    }

    parts
      .into_iter()
      .filter(|part| !part.is_empty())
      .collect::<Vec<_>>()
      .join("-")
  }
}

impl ToString for BrowserKey {
  fn to_string(&self) -> String {
    self.slug()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_run_id() {
    let run_id = RunId::new(42);
    assert_eq!(run_id, RunId::new(42));
    assert_eq!(run_id.inner(), 42);
    assert_eq!(run_id.to_string(), "42".to_string());
  }

  #[test]
  fn test_feature_id() {
    let feature_id = FeatureId::new(7);
    assert_eq!(feature_id, FeatureId::new(7));
    assert_eq!(feature_id.inner(), 7);
    assert_eq!(feature_id.to_string(), "7".to_string());
  }

  #[test]
  fn test_browser_key_slug() {
    let key = BrowserKey::new("chrome", "120", "linux", "6.1");
    assert_eq!(key.slug(), "chrome-120-linux-6.1".to_string());
  }

  #[test]
  fn test_browser_key_slug_with_device() {
    let key = BrowserKey::new("chrome", "120", "android", "14").with_device("Pixel 8");
    assert_eq!(key.slug(), "chrome-120-android-14-Pixel 8".to_string());
  }

  #[test]
  fn test_browser_key_slug_skips_empty_fields() {
    let key = BrowserKey::new("firefox", "", "windows", "11");
    assert_eq!(key.slug(), "firefox-windows-11".to_string());
  }
}

use crate::ledger::StatsLedger;
use crate::settings::Settings;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SETTINGS_FILE: &str = "settings.json";
const STATS_FILE: &str = "stats.json";

/// JSON files in the data directory. Every save replaces the whole file.
#[derive(Debug, Clone)]
pub struct Persistence {
    dir: PathBuf,
}

impl Persistence {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "pabloagn", "Tomato")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(Self::with_dir(proj_dirs.data_dir()))
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    /// Saved settings, or defaults when the file is missing, unreadable or
    /// holds values outside the accepted ranges.
    pub fn load_settings(&self) -> Settings {
        let path = self.settings_path();
        match read_json::<Settings>(&path) {
            Ok(Some(settings)) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    warn!("Ignoring saved settings at {:?}: {}", path, e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Could not load settings: {:#}", e);
                Settings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        write_json(&self.settings_path(), settings)
    }

    /// Saved statistics. A file that cannot be parsed is moved aside so the
    /// next save does not overwrite it, and an empty ledger is returned.
    pub fn load_stats(&self) -> StatsLedger {
        let path = self.stats_path();
        match read_json::<StatsLedger>(&path) {
            Ok(Some(ledger)) => ledger,
            Ok(None) => StatsLedger::new(),
            Err(e) => {
                warn!("Could not load stats: {:#}", e);
                let aside = path.with_extension("json.corrupt");
                if let Err(e) = fs::rename(&path, &aside) {
                    warn!("Could not move {:?} aside: {}", path, e);
                } else {
                    info!("Moved unreadable stats to {:?}", aside);
                }
                StatsLedger::new()
            }
        }
    }

    pub fn save_stats(&self, ledger: &StatsLedger) -> Result<()> {
        write_json(&self.stats_path(), ledger)
    }

    /// Writes `pomodoro-stats-<date>.json` into `dest_dir`.
    pub fn export_stats(
        &self,
        ledger: &StatsLedger,
        dest_dir: &Path,
        today: NaiveDate,
    ) -> Result<PathBuf> {
        let path = dest_dir.join(format!("pomodoro-stats-{}.json", today.format("%Y-%m-%d")));
        write_json(&path, ledger)?;
        Ok(path)
    }

    /// Writes `pomodoro-settings-<date>.json` into `dest_dir`.
    pub fn export_settings(
        &self,
        settings: &Settings,
        dest_dir: &Path,
        today: NaiveDate,
    ) -> Result<PathBuf> {
        let path = dest_dir.join(format!(
            "pomodoro-settings-{}.json",
            today.format("%Y-%m-%d")
        ));
        write_json(&path, settings)?;
        Ok(path)
    }

    /// Reads a settings file, rejecting it if it fails validation.
    pub fn import_settings(&self, path: &Path) -> Result<Settings> {
        let settings = read_json::<Settings>(path)?
            .ok_or_else(|| anyhow::anyhow!("No settings file at {:?}", path))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        Ok(settings)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let value =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(value))
}

/// Writes to a sibling temp file and renames it over the target.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::FocusRecorder;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn missing_files_give_defaults() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path());
        assert_eq!(store.load_settings(), Settings::default());
        assert!(store.load_stats().is_empty());
    }

    #[test]
    fn settings_roundtrip_through_disk() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path().join("nested"));
        let settings = Settings {
            focus_minutes: 50,
            long_break_minutes: 30,
            auto_start_next: false,
            ..Settings::default()
        };
        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings(), settings);

        let raw = fs::read_to_string(store.settings_path()).unwrap();
        assert!(raw.contains("\"focusTime\": 50"));
        assert!(!store.settings_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path());
        fs::write(store.settings_path(), "{ not json").unwrap();
        assert_eq!(store.load_settings(), Settings::default());

        fs::write(store.settings_path(), r#"{"focusTime": 0}"#).unwrap();
        assert_eq!(store.load_settings(), Settings::default());
    }

    #[test]
    fn stats_roundtrip_and_corrupt_file_is_moved_aside() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path());
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today(), 25);
        store.save_stats(&ledger).unwrap();
        assert_eq!(store.load_stats(), ledger);

        fs::write(store.stats_path(), "[1, 2").unwrap();
        assert!(store.load_stats().is_empty());
        assert!(!store.stats_path().exists());
        assert!(dir.path().join("stats.json.corrupt").exists());
    }

    #[test]
    fn export_and_import_settings() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path());
        let settings = Settings {
            focus_minutes: 40,
            ..Settings::default()
        };
        let path = store
            .export_settings(&settings, dir.path(), today())
            .unwrap();
        assert!(path.ends_with("pomodoro-settings-2026-10-18.json"));
        assert_eq!(store.import_settings(&path).unwrap(), settings);

        fs::write(&path, r#"{"shortBreak": 20, "longBreak": 10}"#).unwrap();
        assert!(store.import_settings(&path).is_err());
    }

    #[test]
    fn export_stats_names_file_by_date() {
        let dir = tempdir().unwrap();
        let store = Persistence::with_dir(dir.path());
        let mut ledger = StatsLedger::new();
        ledger.record_focus_session(today(), 25);
        let path = store.export_stats(&ledger, dir.path(), today()).unwrap();
        assert!(path.ends_with("pomodoro-stats-2026-10-18.json"));
        let raw = fs::read_to_string(path).unwrap();
        assert!(raw.contains("2026-10-18"));
    }
}

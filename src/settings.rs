use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::config::{
    APP_NAME, DEFAULT_CLOCK_SIZE, DEFAULT_FACE_COLOR, DEFAULT_HANDS_COLOR, DEFAULT_OUTLINE_COLOR,
    MIN_CLOCK_SIZE,
};
use crate::types::{clamp_size, default_color, ClockColor, ClockConfig, NONE_COLOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKey {
    Size,
    Hands,
    Outline,
    Face,
}

impl SettingKey {
    pub fn name(self) -> &'static str {
        match self {
            SettingKey::Size => "clock-size",
            SettingKey::Hands => "clock-hands",
            SettingKey::Outline => "clock-outline",
            SettingKey::Face => "clock-face",
        }
    }

    fn default_color(self) -> &'static str {
        match self {
            SettingKey::Hands => DEFAULT_HANDS_COLOR,
            SettingKey::Outline => DEFAULT_OUTLINE_COLOR,
            SettingKey::Face | SettingKey::Size => DEFAULT_FACE_COLOR,
        }
    }
}

impl FromStr for SettingKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "clock-size" => Ok(SettingKey::Size),
            "clock-hands" => Ok(SettingKey::Hands),
            "clock-outline" => Ok(SettingKey::Outline),
            "clock-face" => Ok(SettingKey::Face),
            _ => Err(anyhow::anyhow!("unknown setting: {value}")),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key-value storage behind the settings bridge.
pub trait SettingsStore {
    fn get_int(&self, key: SettingKey) -> Option<i64>;
    fn get_string(&self, key: SettingKey) -> Option<String>;
    fn set_int(&mut self, key: SettingKey, value: i64) -> Result<()>;
    fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()>;
    /// Drops cached values so the next reads see external writes.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(rename = "clock-size", skip_serializing_if = "Option::is_none")]
    clock_size: Option<i64>,
    #[serde(rename = "clock-hands", skip_serializing_if = "Option::is_none")]
    clock_hands: Option<String>,
    #[serde(rename = "clock-outline", skip_serializing_if = "Option::is_none")]
    clock_outline: Option<String>,
    #[serde(rename = "clock-face", skip_serializing_if = "Option::is_none")]
    clock_face: Option<String>,
}

impl StoredSettings {
    fn color_slot(&mut self, key: SettingKey) -> Option<&mut Option<String>> {
        match key {
            SettingKey::Hands => Some(&mut self.clock_hands),
            SettingKey::Outline => Some(&mut self.clock_outline),
            SettingKey::Face => Some(&mut self.clock_face),
            SettingKey::Size => None,
        }
    }
}

/// Settings kept as a small JSON document on disk.
pub struct FileStore {
    path: PathBuf,
    values: StoredSettings,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Self {
        let values = read_settings(&path);
        Self { path, values }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::open(settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.values).context("encode settings")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get_int(&self, key: SettingKey) -> Option<i64> {
        match key {
            SettingKey::Size => self.values.clock_size,
            _ => None,
        }
    }

    fn get_string(&self, key: SettingKey) -> Option<String> {
        match key {
            SettingKey::Hands => self.values.clock_hands.clone(),
            SettingKey::Outline => self.values.clock_outline.clone(),
            SettingKey::Face => self.values.clock_face.clone(),
            SettingKey::Size => None,
        }
    }

    fn set_int(&mut self, key: SettingKey, value: i64) -> Result<()> {
        if key != SettingKey::Size {
            return Err(anyhow::anyhow!("{key} is not an integer setting"));
        }
        self.values.clock_size = Some(value);
        self.save()
    }

    fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let slot = self
            .values
            .color_slot(key)
            .with_context(|| format!("{key} is not a string setting"))?;
        *slot = Some(value.to_string());
        self.save()
    }

    fn reload(&mut self) -> Result<()> {
        self.values = read_settings(&self.path);
        Ok(())
    }
}

fn read_settings(path: &Path) -> StoredSettings {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StoredSettings::default(),
        Err(err) => {
            log::warn!("settings read failed: {}: {err}", path.display());
            return StoredSettings::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(values) => values,
        Err(err) => {
            log::warn!("settings file invalid: {}: {err}", path.display());
            StoredSettings::default()
        }
    }
}

pub fn settings_path() -> Result<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .context("neither XDG_CONFIG_HOME nor HOME is set")?,
    };
    Ok(base.join(APP_NAME).join("settings.json"))
}

/// Typed view of the clock preferences over a [`SettingsStore`].
pub struct Settings<S> {
    store: S,
}

impl<S: SettingsStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-reads every key and returns a validated snapshot.
    pub fn load(&mut self) -> ClockConfig {
        if let Err(err) = self.store.reload() {
            log::warn!("settings reload failed: {err:#}");
        }
        self.validate_and_fix()
    }

    /// Replaces unparseable stored colors with their defaults and writes the fix back.
    pub fn validate_and_fix(&mut self) -> ClockConfig {
        let size = self
            .store
            .get_int(SettingKey::Size)
            .map(clamp_size)
            .unwrap_or(DEFAULT_CLOCK_SIZE);
        ClockConfig {
            size,
            hand_color: self.checked_color(SettingKey::Hands),
            outline_color: self.checked_color(SettingKey::Outline),
            face_color: self.checked_color(SettingKey::Face),
        }
    }

    fn checked_color(&mut self, key: SettingKey) -> ClockColor {
        let default = key.default_color();
        let Some(stored) = self.store.get_string(key) else {
            return default_color(default);
        };
        match stored.parse::<ClockColor>() {
            Ok(color) => color,
            Err(err) => {
                log::warn!("{key}: {err:#}, resetting to {default}");
                if let Err(err) = self.store.set_string(key, default) {
                    log::warn!("{key}: could not persist default: {err:#}");
                }
                default_color(default)
            }
        }
    }

    pub fn reset_face_to_transparent(&mut self) -> Result<()> {
        self.store.set_string(SettingKey::Face, NONE_COLOR)
    }

    /// Writes a value given in its textual form, validating it for the key.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        match key {
            SettingKey::Size => {
                let size: i64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} expects an integer, got {value:?}"))?;
                self.store.set_int(key, clamp_size(size) as i64)
            }
            _ => {
                let color: ClockColor = value.parse().with_context(|| format!("set {key}"))?;
                match color {
                    ClockColor::None => self.store.set_string(key, NONE_COLOR),
                    ClockColor::Rgba(_) => self.store.set_string(key, value.trim()),
                }
            }
        }
    }

    /// Current value of a key as the user would type it.
    pub fn get(&mut self, key: SettingKey) -> String {
        let config = self.validate_and_fix();
        match key {
            SettingKey::Size => config.size.to_string(),
            SettingKey::Hands => config.hand_color.to_string(),
            SettingKey::Outline => config.outline_color.to_string(),
            SettingKey::Face => config.face_color.to_string(),
        }
    }

    /// Lifts a stored size below the supported minimum.
    pub fn ensure_min_size(&mut self) -> Result<()> {
        match self.store.get_int(SettingKey::Size) {
            Some(size) if size < MIN_CLOCK_SIZE as i64 => {
                log::info!("clock size {size} below minimum, storing {MIN_CLOCK_SIZE}");
                self.store.set_int(SettingKey::Size, MIN_CLOCK_SIZE as i64)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub ints: HashMap<&'static str, i64>,
        pub strings: HashMap<&'static str, String>,
        pub writes: usize,
    }

    impl SettingsStore for MemoryStore {
        fn get_int(&self, key: SettingKey) -> Option<i64> {
            self.ints.get(key.name()).copied()
        }

        fn get_string(&self, key: SettingKey) -> Option<String> {
            self.strings.get(key.name()).cloned()
        }

        fn set_int(&mut self, key: SettingKey, value: i64) -> Result<()> {
            self.writes += 1;
            self.ints.insert(key.name(), value);
            Ok(())
        }

        fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()> {
            self.writes += 1;
            self.strings.insert(key.name(), value.to_string());
            Ok(())
        }
    }

    fn settings_with(outline: &str) -> Settings<MemoryStore> {
        let mut store = MemoryStore::default();
        store.strings.insert("clock-outline", outline.to_string());
        Settings::new(store)
    }

    #[test]
    fn invalid_color_is_replaced_and_persisted() {
        let mut settings = settings_with("not-a-color");
        let config = settings.validate_and_fix();
        assert_eq!(config.outline_color.to_string(), "#000000");
        assert_eq!(
            settings.store().get_string(SettingKey::Outline).as_deref(),
            Some("#000000")
        );
        assert_eq!(settings.store().writes, 1);
    }

    #[test]
    fn sentinel_survives_validation() {
        let mut settings = settings_with("none");
        let config = settings.validate_and_fix();
        assert_eq!(config.outline_color, ClockColor::None);
        assert_eq!(
            settings.store().get_string(SettingKey::Outline).as_deref(),
            Some("none")
        );
        assert_eq!(settings.store().writes, 0);
    }

    #[test]
    fn missing_keys_use_defaults_without_writing() {
        let mut settings = Settings::new(MemoryStore::default());
        let config = settings.load();
        assert_eq!(config, ClockConfig::default());
        assert_eq!(config.face_color.to_string(), "#ffffff");
        assert_eq!(settings.store().writes, 0);
    }

    #[test]
    fn stored_size_is_clamped_on_load() {
        let mut store = MemoryStore::default();
        store.ints.insert("clock-size", 500);
        let mut settings = Settings::new(store);
        assert_eq!(settings.load().size, 100);
    }

    #[test]
    fn set_validates_and_clamps() {
        let mut settings = Settings::new(MemoryStore::default());
        settings.set(SettingKey::Size, "12").unwrap();
        assert_eq!(settings.store().get_int(SettingKey::Size), Some(22));
        settings.set(SettingKey::Hands, " #ff0000 ").unwrap();
        assert_eq!(
            settings.store().get_string(SettingKey::Hands).as_deref(),
            Some("#ff0000")
        );
        assert!(settings.set(SettingKey::Face, "chartreuse-ish").is_err());
        assert!(settings.set(SettingKey::Size, "big").is_err());
        assert_eq!(settings.get(SettingKey::Hands), "#ff0000");
    }

    #[test]
    fn reset_face_writes_sentinel() {
        let mut settings = Settings::new(MemoryStore::default());
        settings.reset_face_to_transparent().unwrap();
        assert_eq!(settings.load().face_color, ClockColor::None);
        assert_eq!(settings.get(SettingKey::Face), "none");
    }

    #[test]
    fn ensure_min_size_only_lifts_small_values() {
        let mut store = MemoryStore::default();
        store.ints.insert("clock-size", 10);
        let mut settings = Settings::new(store);
        settings.ensure_min_size().unwrap();
        assert_eq!(settings.store().get_int(SettingKey::Size), Some(22));

        settings.set(SettingKey::Size, "80").unwrap();
        settings.ensure_min_size().unwrap();
        assert_eq!(settings.store().get_int(SettingKey::Size), Some(80));
    }

    #[test]
    fn key_names_round_trip() {
        for key in [SettingKey::Size, SettingKey::Hands, SettingKey::Outline, SettingKey::Face] {
            assert_eq!(key.name().parse::<SettingKey>().unwrap(), key);
        }
        assert!("clock-hand".parse::<SettingKey>().is_err());
    }

    #[test]
    fn file_store_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::new(FileStore::open(path.clone()));
        settings.set(SettingKey::Size, "64").unwrap();
        settings.set(SettingKey::Outline, "not-a-color").unwrap_err();
        settings.reset_face_to_transparent().unwrap();

        let mut other = FileStore::open(path.clone());
        assert_eq!(other.get_int(SettingKey::Size), Some(64));
        other.set_string(SettingKey::Hands, "#123456").unwrap();

        let config = settings.load();
        assert_eq!(config.size, 64);
        assert_eq!(config.hand_color.to_string(), "#123456");
        assert_eq!(config.face_color, ClockColor::None);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"clock-face\": \"none\""));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let mut settings = Settings::new(FileStore::open(path));
        assert_eq!(settings.load(), ClockConfig::default());
    }
}

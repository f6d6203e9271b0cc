//! User settings
//!
//! Settings are a plain typed struct persisted as TOML. Each field has a
//! getter and a setter; setters notify listeners and write the file when
//! the settings were loaded from (or bound to) a path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stblcore::locale::Locale;

use crate::error::Result;

/// Settings file name inside the config directory
const SETTINGS_FILE: &str = "settings.toml";

fn default_entries_per_page() -> u32 {
    25
}

/// Persisted settings values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Locale for uploads that do not name one
    pub default_locale: Locale,
    pub entries_per_page: u32,
    pub has_workspace: bool,
    pub disable_blur: bool,
    pub light_theme: bool,
    pub reduce_motion: bool,
    pub show_all_strings: bool,
    pub show_translate_keys: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_locale: 0,
            entries_per_page: default_entries_per_page(),
            has_workspace: false,
            disable_blur: false,
            light_theme: false,
            reduce_motion: false,
            show_all_strings: false,
            show_translate_keys: false,
        }
    }
}

/// Identifies the field a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    DefaultLocale,
    EntriesPerPage,
    HasWorkspace,
    DisableBlur,
    LightTheme,
    ReduceMotion,
    ShowAllStrings,
    ShowTranslateKeys,
}

type Listener = Box<dyn FnMut(SettingKey, &UserSettings)>;

/// Settings with change listeners and optional file persistence.
#[derive(Default)]
pub struct Settings {
    values: UserSettings,
    path: Option<PathBuf>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("values", &self.values)
            .field("path", &self.path)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

macro_rules! setting {
    ($get:ident, $set:ident, $ty:ty, $key:ident) => {
        #[must_use]
        pub fn $get(&self) -> $ty {
            self.values.$get
        }

        pub fn $set(&mut self, value: $ty) {
            if self.values.$get != value {
                self.values.$get = value;
                self.changed(SettingKey::$key);
            }
        }
    };
}

impl Settings {
    /// In-memory settings that are never written to disk.
    #[must_use]
    pub fn new(values: UserSettings) -> Self {
        Self {
            values,
            path: None,
            listeners: Vec::new(),
        }
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("StblStudio").join(SETTINGS_FILE))
    }

    /// Load settings from the default path, or defaults if unavailable.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`, or defaults if the file does not exist.
    /// Later changes are saved to `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid settings
    /// TOML.
    pub fn try_load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => UserSettings::default(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            values,
            path: Some(path),
            listeners: Vec::new(),
        })
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable. Later changes are saved to `path`.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::try_load_from(path.clone()).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "Ignoring invalid settings file");
            Self {
                values: UserSettings::default(),
                path: Some(path),
                listeners: Vec::new(),
            }
        })
    }

    /// Write settings to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(&self.values)?)?;
        Ok(())
    }

    #[must_use]
    pub fn values(&self) -> &UserSettings {
        &self.values
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Register a callback run after every change.
    pub fn add_listener(&mut self, listener: impl FnMut(SettingKey, &UserSettings) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    setting!(default_locale, set_default_locale, Locale, DefaultLocale);
    setting!(entries_per_page, set_entries_per_page, u32, EntriesPerPage);
    setting!(has_workspace, set_has_workspace, bool, HasWorkspace);
    setting!(disable_blur, set_disable_blur, bool, DisableBlur);
    setting!(light_theme, set_light_theme, bool, LightTheme);
    setting!(reduce_motion, set_reduce_motion, bool, ReduceMotion);
    setting!(show_all_strings, set_show_all_strings, bool, ShowAllStrings);
    setting!(show_translate_keys, set_show_translate_keys, bool, ShowTranslateKeys);

    fn changed(&mut self, key: SettingKey) {
        if let Some(path) = &self.path {
            if let Err(err) = self.save_to(path) {
                tracing::warn!(path = %path.display(), %err, "Failed to save settings");
            }
        }
        for listener in &mut self.listeners {
            listener(key, &self.values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_locale(), 0);
        assert_eq!(settings.entries_per_page(), 25);
        assert!(!settings.show_all_strings());
        assert!(settings.path().is_none());
    }

    #[test]
    fn test_listeners_fire_on_change_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut settings = Settings::new(UserSettings::default());
        let sink = Rc::clone(&seen);
        settings.add_listener(move |key, values| sink.borrow_mut().push((key, values.default_locale)));

        settings.set_default_locale(7);
        settings.set_default_locale(7);
        settings.set_light_theme(true);

        assert_eq!(
            *seen.borrow(),
            vec![(SettingKey::DefaultLocale, 7), (SettingKey::LightTheme, 7)]
        );
    }

    #[test]
    fn test_persists_to_bound_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::load_from(&path);
        assert_eq!(settings.values(), &UserSettings::default());
        settings.set_entries_per_page(100);
        settings.set_show_translate_keys(true);

        let reloaded = Settings::load_from(&path);
        assert_eq!(reloaded.entries_per_page(), 100);
        assert!(reloaded.show_translate_keys());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "default_locale = 3\n").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.default_locale(), 3);
        assert_eq!(settings.entries_per_page(), 25);
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "default_locale = \"english\"\n").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.values(), &UserSettings::default());
        assert_eq!(settings.path(), Some(path.as_path()));
    }

    #[test]
    fn test_try_load_from_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "entries_per_page = [\n").unwrap();

        assert!(matches!(Settings::try_load_from(&path), Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_try_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = Settings::try_load_from(&path).unwrap();
        assert_eq!(settings.values(), &UserSettings::default());
        assert_eq!(settings.path(), Some(path.as_path()));
    }
}

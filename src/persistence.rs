//! Loading and saving the settings file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;

use crate::config::Settings;
use crate::error::{ConfigError, Result};

/// Environment variable that overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "LOCALPORTS_CONFIG_PATH";

/// Returns the path to the settings file.
///
/// Respects `LOCALPORTS_CONFIG_PATH` if set, otherwise uses the system config
/// directory.
pub fn settings_path() -> std::result::Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join("localports").join("config.toml"))
}

/// Loads settings from the default location.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

/// Loads settings from `path`; a missing file means defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!("no settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(settings)
}

/// Loads, modifies and saves the settings under an exclusive lock.
///
/// The lock file sits next to the settings file, so concurrent `lports config`
/// invocations cannot lose each other's updates.
pub fn with_settings_mut<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&mut Settings) -> Result<T>,
{
    let parent = ensure_parent(path)?;
    let lock_path = parent.join(hidden_sibling(path, "lock")?);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|source| ConfigError::LockFailed {
            path: lock_path.clone(),
            source,
        })?;
    lock_file
        .lock_exclusive()
        .map_err(|source| ConfigError::LockFailed {
            path: lock_path.clone(),
            source,
        })?;

    let result = load_settings_from(path).and_then(|mut settings| {
        let value = f(&mut settings)?;
        save_settings_to(path, &settings)?;
        Ok(value)
    });

    // Dropping the handle releases the lock as well; unlock errors change nothing.
    let _ = FileExt::unlock(&lock_file);
    result
}

/// Saves settings to `path` using an atomic write.
///
/// Writes to a temporary file, syncs it, then renames it over the target so an
/// interrupted write never leaves a truncated file.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let parent = ensure_parent(path)?;

    let content = toml::to_string_pretty(settings).map_err(ConfigError::SerializeFailed)?;

    // Same directory as the target, required for an atomic rename.
    let temp_path = parent.join(hidden_sibling(path, "tmp")?);

    let mut file = File::create(&temp_path).map_err(|source| ConfigError::WriteFailed {
        path: temp_path.clone(),
        source,
    })?;

    file.write_all(content.as_bytes())
        .map_err(|source| ConfigError::WriteFailed {
            path: temp_path.clone(),
            source,
        })?;

    file.sync_all().map_err(|source| ConfigError::WriteFailed {
        path: temp_path.clone(),
        source,
    })?;

    fs::rename(&temp_path, path).map_err(|source| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("saved settings to {}", path.display());
    Ok(())
}

/// `.{file name}.{suffix}`, so settings files sharing a directory never share
/// a lock or temp file.
fn hidden_sibling(path: &Path, suffix: &str) -> std::result::Result<String, ConfigError> {
    let name = path.file_name().ok_or(ConfigError::NoConfigDir)?;
    Ok(format!(".{}.{suffix}", name.to_string_lossy()))
}

fn ensure_parent(path: &Path) -> std::result::Result<PathBuf, ConfigError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(ConfigError::NoConfigDir),
    };
    fs::create_dir_all(&parent).map_err(|source| ConfigError::WriteFailed {
        path: parent.clone(),
        source,
    })?;
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::port::PortRange;
    use tempfile::TempDir;

    fn temp_settings_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        (dir, path)
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let (_dir, path) = temp_settings_path();
        assert_eq!(load_settings_from(&path).unwrap(), Settings::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, path) = temp_settings_path();
        let settings = Settings {
            default_range: PortRange::new(5000, 5100).unwrap(),
            host: "::1".to_string(),
            table_timeout_ms: 750,
        };

        save_settings_to(&path, &settings).unwrap();

        assert_eq!(load_settings_from(&path).unwrap(), settings);
        assert!(!path.with_file_name(".config.toml.tmp").exists());
    }

    #[test]
    fn test_lock_and_temp_names_follow_settings_file() {
        let (_dir, path) = temp_settings_path();
        let other = path.with_file_name("work.toml");

        with_settings_mut(&path, |settings| settings.set_range("6000-6099")).unwrap();
        with_settings_mut(&other, |settings| settings.set_range("7000-7099")).unwrap();

        assert!(path.with_file_name(".config.toml.lock").exists());
        assert!(other.with_file_name(".work.toml.lock").exists());
        assert!(!other.with_file_name(".work.toml.tmp").exists());
        assert_eq!(
            load_settings_from(&path).unwrap().default_range,
            PortRange::new(6000, 6099).unwrap()
        );
        assert_eq!(
            load_settings_from(&other).unwrap().default_range,
            PortRange::new(7000, 7099).unwrap()
        );
    }

    #[test]
    fn test_hidden_sibling_names() {
        assert_eq!(
            hidden_sibling(Path::new("/tmp/a/work.toml"), "lock").unwrap(),
            ".work.toml.lock"
        );
        assert!(hidden_sibling(Path::new("/"), "tmp").is_err());
    }

    #[test]
    fn test_with_settings_mut_persists_change() {
        let (_dir, path) = temp_settings_path();

        let range = with_settings_mut(&path, |settings| settings.set_range("6000-6099")).unwrap();

        assert_eq!(range, PortRange::new(6000, 6099).unwrap());
        assert_eq!(load_settings_from(&path).unwrap().default_range, range);
    }

    #[test]
    fn test_with_settings_mut_failed_update_not_saved() {
        let (_dir, path) = temp_settings_path();

        let err = with_settings_mut(&path, |settings| settings.set_host("bad host")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_error_names_file() {
        let (_dir, path) = temp_settings_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "default_range = \"wide\"").unwrap();

        let err = load_settings_from(&path).unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::ParseFailed { .. })));
        assert!(err.to_string().contains("config.toml"));
    }
}

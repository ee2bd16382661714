//! Where sound-merge looks for its settings.
//!
//! | Platform | Settings file |
//! |----------|---------------|
//! | Linux    | `~/.config/sound-merge/settings.toml` |
//! | macOS    | `~/Library/Application Support/sound-merge/settings.toml` |
//! | Windows  | `%APPDATA%\sound-merge\settings.toml` |
//!
//! `SOUND_MERGE_CONFIG` replaces the platform location; an explicit
//! `--config` on the command line wins over both.

use std::path::{Path, PathBuf};

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "SOUND_MERGE_CONFIG";

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    /// Platform config directory, or `./sound-merge` when there is none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(&base)
    }

    /// Paths rooted at `base/sound-merge`.
    pub fn under(base: &Path) -> Self {
        let config_dir = base.join(env!("CARGO_PKG_NAME"));
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
        }
    }

    /// The settings file to use: `explicit`, then `SOUND_MERGE_CONFIG`, then
    /// the platform default.
    pub fn resolve_settings(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| Self::new().settings_file)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_layout() {
        let paths = AppPaths::under(Path::new("/tmp/cfg"));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/cfg/sound-merge"));
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/cfg/sound-merge/settings.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("run.toml");
        assert_eq!(AppPaths::resolve_settings(Some(explicit.clone())), explicit);
    }

    #[test]
    fn default_ends_in_settings_toml() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.ends_with("sound-merge"));
        assert!(paths.settings_file.starts_with(&paths.config_dir));
    }
}

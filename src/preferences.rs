//! User preferences, stored as JSON in the platform config directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::shapes::Material;

/// Interaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualPrefs {
    /// Half the edge length of a shape handle, in pixels
    pub handle_size: f32,
}

impl Default for VisualPrefs {
    fn default() -> Self {
        Self { handle_size: 12.0 }
    }
}

/// Material given to newly drawn shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsPrefs {
    /// Friction of new shapes
    pub default_friction: f32,
    /// Restitution of new shapes
    pub default_restitution: f32,
}

impl Default for PhysicsPrefs {
    fn default() -> Self {
        Self {
            default_friction: 1.0,
            default_restitution: 0.0,
        }
    }
}

impl PhysicsPrefs {
    /// Material built from the defaults.
    pub fn material(&self) -> Material {
        Material {
            friction: self.default_friction,
            restitution: self.default_restitution,
            ..Material::default()
        }
    }
}

/// Where tileset and parallax images live relative to the game data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePrefs {
    /// Directory of tileset images, relative to the data directory
    pub tileset_prefix: String,
    /// Directory of parallax images, relative to the data directory
    pub parallax_prefix: String,
    /// Game data directory
    pub data_prefix: String,
    /// Rewrite image paths with the prefixes above
    pub use_prefixes: bool,
}

impl Default for FilePrefs {
    fn default() -> Self {
        Self {
            tileset_prefix: Path::new("images").join("tiles").to_string_lossy().into_owned(),
            parallax_prefix: Path::new("images").join("parallax").to_string_lossy().into_owned(),
            data_prefix: String::new(),
            use_prefixes: false,
        }
    }
}

impl FilePrefs {
    /// Path of a tileset image as written to (`save`) or read from a level.
    pub fn tileset_path(&self, file_name: &str, save: bool) -> String {
        self.prefixed(&self.tileset_prefix, file_name, save)
    }

    /// Path of a parallax image as written to (`save`) or read from a level.
    pub fn parallax_path(&self, file_name: &str, save: bool) -> String {
        self.prefixed(&self.parallax_prefix, file_name, save)
    }

    fn prefixed(&self, prefix: &str, file_name: &str, save: bool) -> String {
        if !self.use_prefixes {
            return file_name.to_string();
        }
        let base = Path::new(file_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        let path = if save {
            Path::new(prefix).join(base)
        } else {
            Path::new(&self.data_prefix).join(prefix).join(base)
        };
        path.to_string_lossy().into_owned()
    }
}

/// All user preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Interaction settings
    pub visual: VisualPrefs,
    /// Defaults for new shapes
    pub physics: PhysicsPrefs,
    /// Image path rewriting
    pub files: FilePrefs,
}

impl Preferences {
    /// `<config dir>/arcmap/config.json`
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("arcmap").join("config.json")
    }

    /// Loads the user's preferences, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Loads preferences from `path`. Missing keys take their defaults; a
    /// missing or unreadable file yields the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                info!("Could not open configuration file {}: {}. Using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(prefs) => {
                debug!("Loaded preferences from {}", path.display());
                prefs
            }
            Err(e) => {
                warn!("Invalid configuration file {}: {}. Using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Saves to the user's config directory.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(Self::config_path())
    }

    /// Saves to `path`, creating its directory.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        std::env::temp_dir().join(format!("arcmap_prefs_{nanos}"))
    }

    #[test]
    fn prefixes_pass_through_when_disabled() {
        let files = FilePrefs::default();
        assert_eq!(files.tileset_path("/abs/tiles.png", true), "/abs/tiles.png");
        assert_eq!(files.parallax_path("sky.png", false), "sky.png");
    }

    #[test]
    fn prefixes_rewrite_paths() {
        let files = FilePrefs {
            tileset_prefix: "tiles".into(),
            parallax_prefix: "bg".into(),
            data_prefix: "data".into(),
            use_prefixes: true,
        };
        assert_eq!(
            PathBuf::from(files.tileset_path("/home/me/art/grass.png", true)),
            Path::new("tiles").join("grass.png")
        );
        assert_eq!(
            PathBuf::from(files.parallax_path("clouds.png", false)),
            Path::new("data").join("bg").join("clouds.png")
        );
    }

    #[test]
    fn missing_keys_take_defaults() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"physics": {"default_friction": 0.25}}"#).expect("parse");
        assert_eq!(prefs.physics.default_friction, 0.25);
        assert_eq!(prefs.physics.default_restitution, 0.0);
        assert_eq!(prefs.visual.handle_size, 12.0);
        assert!(!prefs.files.use_prefixes);
    }

    #[test]
    fn save_then_load() {
        let path = temp_dir().join("config.json");
        let mut prefs = Preferences::default();
        prefs.visual.handle_size = 6.0;
        prefs.files.use_prefixes = true;
        prefs.save_to(&path).expect("save");
        assert_eq!(Preferences::load_from(&path), prefs);
    }

    #[test]
    fn unreadable_file_gives_defaults() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join("config.json");
        fs::write(&path, "{ nope").expect("write");
        assert_eq!(Preferences::load_from(&path), Preferences::default());
        assert_eq!(
            Preferences::load_from(dir.join("missing.json")),
            Preferences::default()
        );
    }
}

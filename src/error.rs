use std::path::PathBuf;
use std::{error, fmt, io};

use serde_json::Error as SerdeError;

/// Errors raised while reading or writing level files.
#[derive(Debug)]
pub enum LevelError {
    /// File I/O error on `path`
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// In-memory JSON failed to parse
    Parse(SerdeError),
    /// `path` does not contain valid JSON
    Json {
        /// File being parsed
        path: PathBuf,
        /// Underlying parse error
        source: SerdeError,
    },
    /// The file (or a tileset image it needs) does not exist
    NotFound(PathBuf),
    /// The level has no `tileMap` section
    MissingTileMap,
    /// The `tileMap` section is malformed
    InvalidMap(String),
    /// Unsupported file format (non-JSON)
    UnsupportedFormat(String),
    /// Save requested before the level was given a file name
    Unnamed,
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            LevelError::Parse(err) => write!(f, "Failed to parse JSON: {}", err),
            LevelError::Json { path, source } => {
                write!(f, "Failed to parse JSON in {}: {}", path.display(), source)
            }
            LevelError::NotFound(path) => write!(
                f,
                "Could not find the file \"{}\". Please check your file preferences and make sure that the file exists.",
                path.display()
            ),
            LevelError::MissingTileMap => write!(f, "No tileMap specified in level"),
            LevelError::InvalidMap(msg) => write!(f, "Invalid tile map: {}", msg),
            LevelError::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {}", ext),
            LevelError::Unnamed => write!(f, "The level has no file name"),
        }
    }
}

impl From<SerdeError> for LevelError {
    fn from(err: SerdeError) -> Self {
        LevelError::Parse(err)
    }
}

impl error::Error for LevelError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LevelError::Io { source, .. } => Some(source),
            LevelError::Json { source, .. } => Some(source),
            LevelError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_error_exposes_source() {
        let err = LevelError::Io {
            path: PathBuf::from("level.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("level.json"));
    }

    #[test]
    fn invalid_map_has_no_source() {
        let err = LevelError::InvalidMap("Width not specified for map file".into());
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "Invalid tile map: Width not specified for map file"
        );
    }
}

// src/loader/level_io.rs
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::background::Background;
use crate::error::LevelError;
use crate::preferences::FilePrefs;
use crate::tilemap::TileMap;
use crate::world::BlazeWorld;

use super::background_io::{background_from_json, write_background, JsonBackground};
use super::tilemap_io::{tilemap_from_json, write_tilemap, JsonTileMap};
use super::world_io::{world_from_json, write_world, JsonWorld};

#[derive(Serialize)]
struct JsonLevel {
    background: Option<JsonBackground>,
    #[serde(rename = "tileMap")]
    tile_map: JsonTileMap,
    #[serde(rename = "blazeWorld")]
    blaze_world: Option<JsonWorld>,
}

/// A level as read from disk. Only the tile map is mandatory.
#[derive(Debug, Clone)]
pub struct Level {
    /// Background color and parallax layers
    pub background: Option<Background>,
    /// Tile layers
    pub tile_map: TileMap,
    /// Collision shapes
    pub world: Option<BlazeWorld>,
}

impl Level {
    /// Writes this level to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P, files: &FilePrefs) -> Result<(), LevelError> {
        write_level(
            path,
            &self.tile_map,
            self.world.as_ref(),
            self.background.as_ref(),
            files,
        )
    }
}

fn section(value: &JsonValue, key: &str) -> Option<JsonValue> {
    match value.get(key) {
        None | Some(JsonValue::Null) => None,
        Some(v) => Some(v.clone()),
    }
}

/// Builds a level from an already parsed document.
pub fn level_from_value(value: &JsonValue, files: &FilePrefs) -> Result<Level, LevelError> {
    let background = section(value, "background").map(|bg| background_from_json(&bg, files));
    let tile_map = match section(value, "tileMap") {
        Some(map) => tilemap_from_json(map, files)?,
        None => return Err(LevelError::MissingTileMap),
    };
    let world = section(value, "blazeWorld").map(|w| world_from_json(&w));
    Ok(Level {
        background,
        tile_map,
        world,
    })
}

/// Parses a level from JSON text.
pub fn read_level_str(text: &str, files: &FilePrefs) -> Result<Level, LevelError> {
    let value: JsonValue = serde_json::from_str(text)?;
    level_from_value(&value, files)
}

/// Reads a level file. The path must have a `.json` extension.
pub fn read_level<P: AsRef<Path>>(path: P, files: &FilePrefs) -> Result<Level, LevelError> {
    let p = path.as_ref();
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(LevelError::UnsupportedFormat(p.display().to_string()));
    }

    let txt = fs::read_to_string(p).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LevelError::NotFound(p.to_path_buf()),
        _ => LevelError::Io {
            path: p.to_path_buf(),
            source,
        },
    })?;
    let value: JsonValue = serde_json::from_str(&txt).map_err(|source| LevelError::Json {
        path: p.to_path_buf(),
        source,
    })?;

    let level = level_from_value(&value, files)?;
    info!("Loaded level {}", p.display());
    Ok(level)
}

/// Renders a level as pretty-printed JSON. Missing sections are written as `null`.
pub fn level_to_string(
    tile_map: &TileMap,
    world: Option<&BlazeWorld>,
    background: Option<&Background>,
    files: &FilePrefs,
) -> Result<String, LevelError> {
    let doc = JsonLevel {
        background: background.map(|bg| write_background(bg, files)),
        tile_map: write_tilemap(tile_map, files),
        blaze_world: world.map(write_world),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Writes a level file, replacing any existing one.
pub fn write_level<P: AsRef<Path>>(
    path: P,
    tile_map: &TileMap,
    world: Option<&BlazeWorld>,
    background: Option<&Background>,
    files: &FilePrefs,
) -> Result<(), LevelError> {
    let p = path.as_ref();
    let text = level_to_string(tile_map, world, background, files)?;
    fs::write(p, text).map_err(|source| LevelError::Io {
        path: p.to_path_buf(),
        source,
    })?;
    debug!("Wrote level {}", p.display());
    Ok(())
}

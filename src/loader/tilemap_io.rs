// src/loader/tilemap_io.rs
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::LevelError;
use crate::preferences::FilePrefs;
use crate::tilemap::{Tile, TileMap};

#[derive(Serialize)]
pub(crate) struct JsonTileMap {
    width: usize,
    height: usize,
    #[serde(rename = "tileSize")]
    tile_size: u32,
    images: Vec<JsonImage>,
    layers: Vec<JsonLayer>,
}

#[derive(Serialize)]
struct JsonImage {
    index: usize,
    #[serde(rename = "fileName")]
    file_name: String,
}

#[derive(Serialize)]
struct JsonLayer {
    index: usize,
    name: String,
    visible: bool,
    tiles: Vec<JsonTile>,
}

#[derive(Serialize)]
struct JsonTile {
    x: usize,
    y: usize,
    ix: u32,
    iy: u32,
    ii: u32,
}

// Everything optional so that missing keys get a readable error instead of
// serde's generic one.
#[derive(Deserialize)]
struct RawTileMap {
    width: Option<usize>,
    height: Option<usize>,
    #[serde(rename = "tileSize")]
    tile_size: Option<u32>,
    images: Option<Vec<RawImage>>,
    layers: Option<Vec<RawLayer>>,
}

#[derive(Deserialize)]
struct RawImage {
    index: Option<usize>,
    #[serde(rename = "fileName")]
    file_name: Option<String>,
}

#[derive(Deserialize)]
struct RawLayer {
    index: Option<usize>,
    name: Option<String>,
    visible: Option<bool>,
    #[serde(default)]
    tiles: Vec<RawTile>,
}

#[derive(Deserialize)]
struct RawTile {
    x: Option<usize>,
    y: Option<usize>,
    ix: Option<u32>,
    iy: Option<u32>,
    ii: Option<u32>,
}

fn required<T>(value: Option<T>, what: &str) -> Result<T, LevelError> {
    value.ok_or_else(|| LevelError::InvalidMap(format!("No {what} specified in map file")))
}

/// Serializable form of a tile map; only occupied cells are written.
pub(crate) fn write_tilemap(map: &TileMap, files: &FilePrefs) -> JsonTileMap {
    JsonTileMap {
        width: map.width,
        height: map.height,
        tile_size: map.tile_size,
        images: map
            .images
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                name.as_ref().map(|name| JsonImage {
                    index,
                    file_name: files.tileset_path(name, true),
                })
            })
            .collect(),
        layers: map
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| JsonLayer {
                index,
                name: layer.name.clone(),
                visible: layer.visible,
                tiles: layer
                    .tiles()
                    .map(|(x, y, t)| JsonTile {
                        x,
                        y,
                        ix: t.image_x,
                        iy: t.image_y,
                        ii: t.image_index,
                    })
                    .collect(),
            })
            .collect(),
    }
}

// Largest grid a level may declare, in cells per layer.
const MAX_CELLS: usize = 1 << 24;
const MAX_IMAGES: usize = 1 << 12;

/// Parses the `tileMap` section of a level. Structural problems are errors;
/// a missing layer name or visibility is logged and defaulted.
pub fn tilemap_from_json(value: JsonValue, files: &FilePrefs) -> Result<TileMap, LevelError> {
    let raw: RawTileMap =
        serde_json::from_value(value).map_err(|e| LevelError::InvalidMap(e.to_string()))?;

    let mut map = TileMap {
        width: required(raw.width, "width")?,
        height: required(raw.height, "height")?,
        tile_size: required(raw.tile_size, "tile size")?,
        ..TileMap::default()
    };

    let cells = map.width.checked_mul(map.height).filter(|&n| n <= MAX_CELLS);
    let pixels = |tiles: usize| u32::try_from(tiles).ok()?.checked_mul(map.tile_size);
    if cells.is_none() || pixels(map.width).is_none() || pixels(map.height).is_none() {
        return Err(LevelError::InvalidMap(format!(
            "A {}x{} map is too large",
            map.width, map.height
        )));
    }

    for image in required(raw.images, "image files")? {
        let index = required(image.index, "index for image")?;
        if index >= MAX_IMAGES {
            return Err(LevelError::InvalidMap(format!("Image index {} is too large", index)));
        }
        let file_name = required(image.file_name, "file name for image")?;
        map.add_image(&files.tileset_path(&file_name, false), index);
    }

    let layers = required(raw.layers, "layers")?;
    if layers.is_empty() {
        map.add_layer("New Layer", true, None);
    }
    let layer_count = layers.len();
    for (position, layer) in layers.into_iter().enumerate() {
        let name = layer.name.unwrap_or_else(|| {
            error!("No name specified for layer. Defaulting to \"Unnamed Layer\"");
            "Unnamed Layer".to_string()
        });
        let visible = layer.visible.unwrap_or_else(|| {
            error!("No visibility specified for layer. Defaulting to true");
            true
        });
        // Layers are written densely, one entry per index
        let index = layer.index.unwrap_or(position);
        if index >= layer_count {
            return Err(LevelError::InvalidMap(format!(
                "Layer index {} is out of range for {} layers",
                index, layer_count
            )));
        }
        let z = map.add_layer(&name, visible, Some(index));

        for tile in layer.tiles {
            let x = required(tile.x, "x-coordinate for tile")?;
            let y = required(tile.y, "y-coordinate for tile")?;
            let t = Tile::new(
                required(tile.ix, "image x-coordinate for tile")?,
                required(tile.iy, "image y-coordinate for tile")?,
                required(tile.ii, "image index for tile")?,
            );
            if x >= map.width || y >= map.height {
                warn!("Dropping tile at ({}, {}) outside the {}x{} map", x, y, map.width, map.height);
                continue;
            }
            map.set_tile(t, x, y, z);
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files() -> FilePrefs {
        FilePrefs::default()
    }

    #[test]
    fn reads_sparse_tiles() {
        let value = json!({
            "width": 4, "height": 3, "tileSize": 16,
            "images": [{"index": 1, "fileName": "b.png"}, {"index": 0, "fileName": "a.png"}],
            "layers": [
                {"index": 0, "name": "Ground", "visible": true,
                 "tiles": [{"x": 1, "y": 2, "ix": 3, "iy": 0, "ii": 1}]},
                {"index": 1, "name": "Deco", "visible": false, "tiles": []}
            ]
        });
        let map = tilemap_from_json(value, &files()).expect("valid map");
        assert_eq!((map.width, map.height, map.tile_size), (4, 3, 16));
        assert_eq!(map.images[0].as_deref(), Some("a.png"));
        assert_eq!(map.images[1].as_deref(), Some("b.png"));
        assert_eq!(map.layers.len(), 2);
        assert!(!map.layers[1].visible);
        assert_eq!(map.tile(1, 2, 0), Some(Tile::new(3, 0, 1)));
        assert_eq!(map.layers[0].tile_count(), 1);
    }

    #[test]
    fn missing_width_is_an_error() {
        let err = tilemap_from_json(
            json!({"height": 1, "tileSize": 8, "images": [], "layers": []}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(msg) if msg.contains("width")));
    }

    #[test]
    fn non_integer_width_is_an_error() {
        let err = tilemap_from_json(
            json!({"width": "wide", "height": 1, "tileSize": 8, "images": [], "layers": []}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(_)));
    }

    #[test]
    fn incomplete_tile_is_an_error() {
        let err = tilemap_from_json(
            json!({"width": 1, "height": 1, "tileSize": 8, "images": [],
                   "layers": [{"name": "L", "tiles": [{"x": 0, "y": 0, "ix": 0, "iy": 0}]}]}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(msg) if msg.contains("image index")));
    }

    #[test]
    fn oversized_grid_is_an_error() {
        let err = tilemap_from_json(
            json!({"width": u64::MAX / 2, "height": 4, "tileSize": 16,
                   "images": [], "layers": []}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(msg) if msg.contains("too large")));

        let err = tilemap_from_json(
            json!({"width": 100_000, "height": 100_000, "tileSize": 16,
                   "images": [], "layers": []}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(_)));
    }

    #[test]
    fn out_of_range_indices_are_errors() {
        let err = tilemap_from_json(
            json!({"width": 2, "height": 2, "tileSize": 16, "images": [],
                   "layers": [{"index": 1_000_000_000u64, "name": "Far", "visible": true, "tiles": []}]}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(msg) if msg.contains("Layer index")));

        let err = tilemap_from_json(
            json!({"width": 2, "height": 2, "tileSize": 16,
                   "images": [{"index": 1_000_000_000u64, "fileName": "a.png"}], "layers": []}),
            &files(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::InvalidMap(msg) if msg.contains("Image index")));
    }

    #[test]
    fn empty_layer_list_gets_default_layer() {
        let map = tilemap_from_json(
            json!({"width": 2, "height": 2, "tileSize": 8, "images": [], "layers": []}),
            &files(),
        )
        .expect("valid map");
        assert_eq!(map.layers.len(), 1);
        assert_eq!(map.layers[0].name, "New Layer");
    }

    #[test]
    fn missing_layer_name_and_visibility_default() {
        let map = tilemap_from_json(
            json!({"width": 2, "height": 2, "tileSize": 8, "images": [],
                   "layers": [{"tiles": []}]}),
            &files(),
        )
        .expect("valid map");
        assert_eq!(map.layers[0].name, "Unnamed Layer");
        assert!(map.layers[0].visible);
    }

    #[test]
    fn writes_only_occupied_cells() {
        let mut map = TileMap::create(8, 3, 3);
        map.add_image("tiles.png", 0);
        map.set_tile(Tile::new(1, 1, 0), 2, 0, 0);
        let value = serde_json::to_value(write_tilemap(&map, &files())).expect("serialize");
        assert_eq!(value["tileSize"], 8);
        assert_eq!(value["images"][0]["fileName"], "tiles.png");
        let tiles = value["layers"][0]["tiles"].as_array().expect("tiles array");
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0], json!({"x": 2, "y": 0, "ix": 1, "iy": 1, "ii": 0}));
    }
}

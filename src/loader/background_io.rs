// src/loader/background_io.rs
use std::collections::BTreeMap;

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::background::{color_from_u32, color_to_u32, Background, ParallaxLayer};
use crate::preferences::FilePrefs;

#[derive(Serialize)]
pub(crate) struct JsonBackground {
    #[serde(rename = "bgColor")]
    bg_color: String,
    parallaxes: Vec<JsonParallax>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonParallax {
    index: usize,
    file_name: Option<String>,
    v_tile: bool,
    h_tile: bool,
    v_scroll: bool,
    h_scroll: bool,
    v_scroll_speed: f32,
    h_scroll_speed: f32,
    visible: bool,
}

/// Serializable form of the background. The color is written as `#rrggbbaa`.
pub(crate) fn write_background(background: &Background, files: &FilePrefs) -> JsonBackground {
    JsonBackground {
        bg_color: format!("#{:08x}", color_to_u32(background.color)),
        parallaxes: background
            .parallaxes
            .iter()
            .enumerate()
            .map(|(index, p)| JsonParallax {
                index,
                file_name: p.file_name.as_deref().map(|f| files.parallax_path(f, true)),
                v_tile: p.v_tile,
                h_tile: p.h_tile,
                v_scroll: p.v_scroll,
                h_scroll: p.h_scroll,
                v_scroll_speed: p.v_scroll_speed,
                h_scroll_speed: p.h_scroll_speed,
                visible: p.visible,
            })
            .collect(),
    }
}

fn read_flag(value: &JsonValue, key: &str, label: &str, default: bool) -> bool {
    match value.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(other) => {
            error!(
                "{} for a parallax background must be true or false, got {}. Defaulting to {}",
                key, other, default
            );
            default
        }
        None => {
            error!("No {} specified for parallax. Defaulting to {}", label, default);
            default
        }
    }
}

// Speeds were once written as strings, so both forms are accepted.
fn read_speed(value: &JsonValue, key: &str, label: &str) -> f32 {
    let parsed = match value.get(key) {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => {
            error!("No {} specified for parallax. Defaulting to 1.0", label);
            return 1.0;
        }
    };
    match parsed {
        Some(speed) => speed as f32,
        None => {
            error!(
                "Could not convert {} to a decimal number for parallax {}. Defaulting to 1.0",
                value[key], label
            );
            1.0
        }
    }
}

fn read_parallax(value: &JsonValue) -> (ParallaxLayer, Option<usize>) {
    let index = match value.get("index") {
        Some(v) => match v.as_u64().and_then(|i| usize::try_from(i).ok()) {
            Some(i) => Some(i),
            None => {
                error!("The index of a parallax layer must be an integer");
                None
            }
        },
        None => None,
    };

    let file_name = match value.get("fileName").and_then(JsonValue::as_str) {
        Some(name) => Some(name.to_string()),
        None => {
            error!("No file name specified in file for parallax");
            None
        }
    };

    let visible = match value.get("visible") {
        Some(JsonValue::Bool(b)) => *b,
        _ => {
            error!("No visibility specified for parallax. Defaulting to true");
            true
        }
    };

    let layer = ParallaxLayer {
        file_name,
        v_tile: read_flag(value, "vTile", "vertical tiling", false),
        h_tile: read_flag(value, "hTile", "horizontal tiling", false),
        v_scroll: read_flag(value, "vScroll", "vertical scroll", false),
        h_scroll: read_flag(value, "hScroll", "horizontal scroll", false),
        v_scroll_speed: read_speed(value, "vScrollSpeed", "vertical scroll speed"),
        h_scroll_speed: read_speed(value, "hScrollSpeed", "horizontal scroll speed"),
        visible,
    };
    (layer, index)
}

/// Parses the `background` section. Never fails; bad fields are logged and
/// defaulted, parallax index gaps are closed up.
pub fn background_from_json(value: &JsonValue, files: &FilePrefs) -> Background {
    let color = match value.get("bgColor").and_then(JsonValue::as_str) {
        Some(text) => {
            let digits = text.get(1..).unwrap_or_default();
            u32::from_str_radix(digits, 16).unwrap_or_else(|_| {
                error!("Could not parse background color {:?}. Defaulting to black", text);
                0
            })
        }
        None => {
            error!("No background color specified. Defaulting to black");
            0
        }
    };

    // Indexed layers are ordered by index, the rest follow in file order.
    let mut indexed: BTreeMap<usize, ParallaxLayer> = BTreeMap::new();
    let mut appended: Vec<ParallaxLayer> = Vec::new();
    match value.get("parallaxes").and_then(JsonValue::as_array) {
        Some(list) => {
            for entry in list {
                let (mut layer, index) = read_parallax(entry);
                layer.file_name = layer.file_name.map(|f| files.parallax_path(&f, false));
                match index {
                    Some(i) => {
                        if indexed.insert(i, layer).is_some() {
                            warn!("Parallax index {} is used twice. Keeping the last one", i);
                        }
                    }
                    None => appended.push(layer),
                }
            }
        }
        None => info!("No parallaxes specified"),
    }

    if indexed.keys().enumerate().any(|(n, &i)| n != i) {
        warn!("Parallax indices are not consecutive. Closing the gaps");
    }

    Background {
        color: color_from_u32(color),
        parallaxes: indexed.into_values().chain(appended).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_color_and_layers() {
        let bg = background_from_json(
            &json!({
                "bgColor": "#336699ff",
                "parallaxes": [
                    {"index": 1, "fileName": "near.png", "vTile": false, "hTile": true,
                     "vScroll": false, "hScroll": true, "vScrollSpeed": 1.0,
                     "hScrollSpeed": "0.5", "visible": false},
                    {"index": 0, "fileName": "far.png"}
                ]
            }),
            &FilePrefs::default(),
        );
        assert_eq!(color_to_u32(bg.color), 0x336699ff);
        assert_eq!(bg.parallaxes.len(), 2);
        assert_eq!(bg.parallaxes[0].file_name.as_deref(), Some("far.png"));
        assert!(bg.parallaxes[0].visible);
        let near = &bg.parallaxes[1];
        assert!(near.h_tile && near.h_scroll && !near.visible);
        assert_eq!(near.h_scroll_speed, 0.5);
    }

    #[test]
    fn gaps_are_compacted() {
        let bg = background_from_json(
            &json!({"bgColor": "#00000000", "parallaxes": [
                {"index": 3, "fileName": "c.png"},
                {"fileName": "d.png"},
                {"index": 0, "fileName": "a.png"}
            ]}),
            &FilePrefs::default(),
        );
        let names: Vec<_> = bg
            .parallaxes
            .iter()
            .map(|p| p.file_name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, ["a.png", "c.png", "d.png"]);
    }

    #[test]
    fn huge_indices_only_order_layers() {
        let bg = background_from_json(
            &json!({"parallaxes": [
                {"index": u64::MAX, "fileName": "last.png"},
                {"index": 1_000_000_000_000u64, "fileName": "middle.png"},
                {"index": 2, "fileName": "first.png"}
            ]}),
            &FilePrefs::default(),
        );
        let names: Vec<_> = bg
            .parallaxes
            .iter()
            .map(|p| p.file_name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, ["first.png", "middle.png", "last.png"]);
    }

    #[test]
    fn bad_color_defaults_to_transparent_black() {
        let bg = background_from_json(&json!({"bgColor": "#zzzz"}), &FilePrefs::default());
        assert_eq!(color_to_u32(bg.color), 0);
        assert!(bg.parallaxes.is_empty());
        let bg = background_from_json(&json!({}), &FilePrefs::default());
        assert_eq!(color_to_u32(bg.color), 0);
    }

    #[test]
    fn bad_speed_defaults_to_one() {
        let bg = background_from_json(
            &json!({"parallaxes": [{"fileName": "x.png", "vScrollSpeed": "fast", "vTile": "yes"}]}),
            &FilePrefs::default(),
        );
        assert_eq!(bg.parallaxes[0].v_scroll_speed, 1.0);
        assert!(!bg.parallaxes[0].v_tile);
    }

    #[test]
    fn writes_hex_color() {
        let mut bg = Background::default();
        bg.parallaxes.push(ParallaxLayer::new("sky.png"));
        let value = serde_json::to_value(write_background(&bg, &FilePrefs::default()))
            .expect("serialize");
        assert_eq!(value["bgColor"], "#000000ff");
        assert_eq!(value["parallaxes"][0]["fileName"], "sky.png");
        assert_eq!(value["parallaxes"][0]["hScrollSpeed"], 1.0);
        assert_eq!(value["parallaxes"][0]["index"], 0);
    }
}

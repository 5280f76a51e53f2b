// src/loader/world_io.rs
use log::error;
use macroquad::math::{vec2, Vec2};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::shapes::{Circle, Material, Polygon, Shape};
use crate::world::{BlazeWorld, DEFAULT_GRAVITY};

#[derive(Serialize)]
pub(crate) struct JsonWorld {
    shapes: Vec<JsonShape>,
    #[serde(rename = "gravityX")]
    gravity_x: f32,
    #[serde(rename = "gravityY")]
    gravity_y: f32,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonShape {
    Polygon {
        points: Vec<JsonPoint>,
        damage: f32,
        friction: f32,
        restitution: f32,
    },
    Circle {
        center: JsonPoint,
        radius: f32,
        damage: f32,
        friction: f32,
        restitution: f32,
    },
}

#[derive(Serialize)]
struct JsonPoint {
    x: f32,
    y: f32,
}

impl From<Vec2> for JsonPoint {
    fn from(p: Vec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

fn shape_to_json(shape: &Shape) -> JsonShape {
    let Material {
        friction,
        restitution,
        damage,
    } = *shape.material();
    match shape {
        Shape::Polygon(p) => JsonShape::Polygon {
            points: p.points().iter().copied().map(JsonPoint::from).collect(),
            damage,
            friction,
            restitution,
        },
        Shape::Circle(c) => JsonShape::Circle {
            center: c.center().into(),
            radius: c.radius(),
            damage,
            friction,
            restitution,
        },
    }
}

/// Serializable form of the collision world.
pub(crate) fn write_world(world: &BlazeWorld) -> JsonWorld {
    JsonWorld {
        shapes: world.shapes().map(|(_, s)| shape_to_json(s)).collect(),
        gravity_x: world.gravity.x,
        gravity_y: world.gravity.y,
    }
}

fn number(value: Option<&JsonValue>) -> Option<f32> {
    value.and_then(JsonValue::as_f64).map(|n| n as f32)
}

fn read_point(value: &JsonValue) -> Option<Vec2> {
    Some(vec2(number(value.get("x"))?, number(value.get("y"))?))
}

fn read_material(value: &JsonValue) -> Material {
    let mut material = Material::default();
    if let Some(damage) = number(value.get("damage")) {
        material.damage = damage;
    }
    if let Some(friction) = number(value.get("friction")) {
        material.friction = friction;
    }
    if let Some(restitution) = number(value.get("restitution")) {
        material.restitution = restitution;
    }
    material
}

fn read_polygon(value: &JsonValue) -> Polygon {
    let mut points = Vec::new();
    match value.get("points").and_then(JsonValue::as_array) {
        Some(list) => {
            for p in list {
                match read_point(p) {
                    Some(point) => points.push(point),
                    None => error!("Could not parse polygon point {}", p),
                }
            }
        }
        None => error!("Polygon specified with no points"),
    }
    Polygon::new(points).with_material(read_material(value))
}

fn read_circle(value: &JsonValue) -> Circle {
    let center = value.get("center").and_then(read_point).unwrap_or_else(|| {
        error!("Circle specified with no center");
        Vec2::ZERO
    });
    let radius = number(value.get("radius")).unwrap_or_else(|| {
        error!("Circle specified with no radius");
        0.0
    });
    Circle::new(center, radius).with_material(read_material(value))
}

fn read_shape(value: &JsonValue) -> Option<Shape> {
    match value.get("type").and_then(JsonValue::as_str) {
        Some("polygon") => Some(read_polygon(value).into()),
        Some("circle") => Some(read_circle(value).into()),
        Some(other) => {
            error!("Invalid shape type \"{}\" specified in file", other);
            None
        }
        None => {
            error!("Shape specified with no type");
            None
        }
    }
}

/// Parses the `blazeWorld` section. Never fails: malformed fields are logged
/// and defaulted, unreadable shapes are skipped.
pub fn world_from_json(value: &JsonValue) -> BlazeWorld {
    let mut world = BlazeWorld::new();

    world.gravity.x = match value.get("gravityX") {
        Some(v) => number(Some(v)).unwrap_or_else(|| {
            error!("Gravity X-component must be a number. Defaulting to {}", DEFAULT_GRAVITY.x);
            DEFAULT_GRAVITY.x
        }),
        None => {
            error!("Gravity X-component not specified in file. Defaulting to {}", DEFAULT_GRAVITY.x);
            DEFAULT_GRAVITY.x
        }
    };
    world.gravity.y = match value.get("gravityY") {
        Some(v) => number(Some(v)).unwrap_or_else(|| {
            error!("Gravity Y-component must be a number. Defaulting to {}", DEFAULT_GRAVITY.y);
            DEFAULT_GRAVITY.y
        }),
        None => {
            error!("Gravity Y-component not specified in file. Defaulting to {}", DEFAULT_GRAVITY.y);
            DEFAULT_GRAVITY.y
        }
    };

    match value.get("shapes").and_then(JsonValue::as_array) {
        Some(shapes) => {
            for shape in shapes.iter().filter_map(read_shape) {
                world.add_shape(shape);
            }
        }
        None => error!("No shapes attribute specified in the file"),
    }

    world
}

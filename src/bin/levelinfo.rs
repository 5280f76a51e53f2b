//! Prints a summary of a level file.
//!
//! Usage: `levelinfo <level.json>`. Set `RUST_LOG=debug` for loader details.

use anyhow::{bail, Context};
use arcmap::background::color_to_u32;
use arcmap::{read_level, Preferences, Shape};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: levelinfo <level.json>");
    };
    let prefs = Preferences::load();
    let level = read_level(&path, &prefs.files).with_context(|| format!("Loading level {}", path))?;

    let map = &level.tile_map;
    println!(
        "{}: {}x{} tiles of {}px ({}x{} px)",
        path,
        map.width,
        map.height,
        map.tile_size,
        map.pixel_width(),
        map.pixel_height()
    );

    println!("images:");
    for (index, image) in map.images.iter().enumerate() {
        if let Some(name) = image {
            println!("  [{}] {}", index, name);
        }
    }

    println!("layers:");
    for (index, layer) in map.layers.iter().enumerate() {
        println!(
            "  [{}] {:<20} {:>5} tiles{}",
            index,
            layer.name,
            layer.tile_count(),
            if layer.visible { "" } else { " (hidden)" }
        );
    }

    match &level.world {
        Some(world) => {
            println!(
                "world: gravity ({}, {}), {} shapes",
                world.gravity.x,
                world.gravity.y,
                world.len()
            );
            for (id, shape) in world.shapes() {
                let detail = match shape {
                    Shape::Polygon(p) => format!(
                        "{} points, {}",
                        p.points().len(),
                        if p.is_convex() { "convex" } else { "concave" }
                    ),
                    Shape::Circle(c) => format!("radius {}", c.radius()),
                };
                let m = shape.material();
                println!(
                    "  #{} {} at ({}, {}): {}; friction {}, restitution {}, damage {}",
                    id.0,
                    shape.kind(),
                    shape.center().x,
                    shape.center().y,
                    detail,
                    m.friction,
                    m.restitution,
                    m.damage
                );
            }
        }
        None => println!("world: none"),
    }

    match &level.background {
        Some(bg) => {
            println!(
                "background: #{:08x}, {} parallax layers",
                color_to_u32(bg.color),
                bg.parallaxes.len()
            );
            for (index, p) in bg.parallaxes.iter().enumerate() {
                println!(
                    "  [{}] {} speed ({}, {}){}",
                    index,
                    p.file_name.as_deref().unwrap_or("<no file>"),
                    p.h_scroll_speed,
                    p.v_scroll_speed,
                    if p.visible { "" } else { " (hidden)" }
                );
            }
        }
        None => println!("background: none"),
    }

    Ok(())
}

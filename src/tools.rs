//! Editing tools as input state machines.
//!
//! A front end forwards pointer events to the active tool, which edits the
//! level through the [`MapController`] and records undo actions. Every event
//! handler returns whether the view needs a redraw. Nothing here draws.

use macroquad::math::{vec2, Rect, Vec2};

use crate::controller::MapController;
use crate::shapes::{point_in_handle, Circle, Material, Polygon, Shape};
use crate::tilemap::Tile;
use crate::undo::{ShapeAdd, ShapeAdjust, ShapeDelete, ShapeMove, TileAdd, TileRemove};
use crate::world::ShapeId;

/// Snaps a pixel position to the nearest multiple of `step`.
pub fn coords_to_tile_edges(x: f32, y: f32, step: f32) -> Vec2 {
    if step <= 0.0 {
        return vec2(x, y);
    }
    vec2((x / step).round() * step, (y / step).round() * step)
}

/// Cell containing a pixel position. Negative positions map to cell 0.
pub fn coords_to_tiles(x: f32, y: f32, tile_size: u32) -> (usize, usize) {
    let ts = tile_size.max(1) as f32;
    ((x / ts).floor().max(0.0) as usize, (y / ts).floor().max(0.0) as usize)
}

/// Pixel rectangle covering the cells between two corners, inclusive.
pub fn rectangle_select(x1: usize, y1: usize, x2: usize, y2: usize, tile_size: u32) -> Rect {
    let ts = tile_size as f32;
    Rect::new(
        x1.min(x2) as f32 * ts,
        y1.min(y2) as f32 * ts,
        (x1.abs_diff(x2) + 1) as f32 * ts,
        (y1.abs_diff(y2) + 1) as f32 * ts,
    )
}

/// Pointer buttons the tools react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Usually the left button
    Primary,
    /// Usually the right button
    Secondary,
}

/// Common interface of all tools.
pub trait EditorTool {
    /// Pointer moved to `(x, y)` in pixels.
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool;
    /// A button went down at the last pointer position.
    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool;
    /// A button went up at the last pointer position.
    fn button_release(&mut self, ctl: &mut MapController, button: MouseButton) -> bool;
    /// One-line usage hint for a status bar.
    fn instructions(&self) -> &str;
}

fn clamp_to(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    vec2(x.clamp(0.0, (width - 1.0).max(0.0)), y.clamp(0.0, (height - 1.0).max(0.0)))
}

fn clamp_to_map(ctl: &MapController, x: f32, y: f32) -> Vec2 {
    match ctl.map() {
        Some(map) => clamp_to(x, y, map.pixel_width() as f32, map.pixel_height() as f32),
        None => vec2(x.max(0.0), y.max(0.0)),
    }
}

fn half_tile(ctl: &MapController) -> f32 {
    ctl.tile_size().map_or(1.0, |ts| (ts / 2).max(1) as f32)
}

fn new_shape_material(ctl: &MapController) -> Material {
    ctl.preferences().physics.material()
}

// Rubber-band selection of cells shared by the tile tools.
#[derive(Debug, Default)]
struct TileDrag {
    start: (usize, usize),
    end: (usize, usize),
    last: Option<(usize, usize)>,
    down: bool,
}

impl TileDrag {
    fn press(&mut self, cell: (usize, usize)) {
        self.start = cell;
        self.end = cell;
        self.last = Some(cell);
        self.down = true;
    }

    // True when the pointer entered another cell.
    fn motion(&mut self, cell: (usize, usize)) -> bool {
        if self.down {
            self.end = cell;
        }
        if self.last == Some(cell) {
            return false;
        }
        self.last = Some(cell);
        true
    }

    // Normalized (x1, y1, x2, y2) of the finished drag.
    fn release(&mut self) -> (usize, usize, usize, usize) {
        self.down = false;
        (
            self.start.0.min(self.end.0),
            self.start.1.min(self.end.1),
            self.start.0.max(self.end.0),
            self.start.1.max(self.end.1),
        )
    }

    fn is_single_cell(&self) -> bool {
        self.start == self.end
    }
}

/// Picks the paint brush from a tileset image.
pub struct TileSelectTool {
    image_index: usize,
    tile_size: u32,
    bounds: Vec2,
    drag: TileDrag,
}

impl TileSelectTool {
    /// Tool for image `image_index` of `width` x `height` pixels.
    pub fn new(image_index: usize, tile_size: u32, width: f32, height: f32) -> Self {
        Self {
            image_index,
            tile_size,
            bounds: vec2(width, height),
            drag: TileDrag::default(),
        }
    }

    /// Highlighted rectangle in image pixels.
    pub fn highlight(&self) -> Rect {
        let (x1, y1) = self.drag.start;
        let (x2, y2) = self.drag.end;
        rectangle_select(x1, y1, x2, y2, self.tile_size)
    }
}

impl EditorTool for TileSelectTool {
    fn mouse_motion(&mut self, _ctl: &mut MapController, x: f32, y: f32) -> bool {
        let p = clamp_to(x, y, self.bounds.x, self.bounds.y);
        self.drag.motion(coords_to_tiles(p.x, p.y, self.tile_size));
        self.drag.down
    }

    fn button_press(&mut self, _ctl: &mut MapController, button: MouseButton) -> bool {
        if button != MouseButton::Primary {
            return false;
        }
        let cell = self.drag.last.unwrap_or_default();
        self.drag.press(cell);
        true
    }

    fn button_release(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if button != MouseButton::Primary || !self.drag.down {
            return false;
        }
        let (x1, y1, x2, y2) = self.drag.release();
        ctl.set_selection(self.image_index, x1 as u32, y1 as u32, x2 as u32, y2 as u32);
        true
    }

    fn instructions(&self) -> &str {
        "Left-click to select tiles. Click and drag to select multiple tiles."
    }
}

/// Paints the brush onto the selected layer.
#[derive(Default)]
pub struct TileDrawTool {
    drag: TileDrag,
}

impl TileDrawTool {
    /// Idle tool.
    pub fn new() -> Self {
        Self::default()
    }

    fn paint(&self, ctl: &mut MapController, x1: usize, y1: usize, x2: usize, y2: usize) {
        let (Some(selection), Some(z), Some(map)) = (ctl.selection(), ctl.selected_layer(), ctl.map()) else {
            return;
        };
        let (width, height) = (map.width, map.height);

        let mut cells: Vec<(usize, usize, Tile)> = Vec::new();
        if self.drag.is_single_cell() {
            // Stamp the whole brush, even past the dragged cell
            for i in 0..selection.width() {
                for j in 0..selection.height() {
                    let tile = Tile::new(selection.x1 + i, selection.y1 + j, selection.image_index as u32);
                    cells.push((x1 + i as usize, y1 + j as usize, tile));
                }
            }
        } else {
            // Repeat the brush, clipped to the dragged rectangle
            for i in 0..=(x2 - x1) {
                for j in 0..=(y2 - y1) {
                    cells.push((x1 + i, y1 + j, selection.tile(i as u32, j as u32)));
                }
            }
        }

        let mut action = TileAdd::new();
        for (x, y, tile) in cells {
            if x >= width || y >= height {
                continue;
            }
            let previous = ctl.add_tile(x, y, z, tile);
            action.push(x, y, z, tile, previous);
        }
        if !action.is_empty() {
            ctl.add_undo_action(action);
        }
    }
}

impl EditorTool for TileDrawTool {
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool {
        let (Some(_), Some(ts)) = (ctl.selection(), ctl.tile_size()) else {
            return false;
        };
        let p = clamp_to_map(ctl, x, y);
        self.drag.motion(coords_to_tiles(p.x, p.y, ts))
    }

    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if ctl.selection().is_none() || button != MouseButton::Primary {
            return false;
        }
        let cell = self.drag.last.unwrap_or_default();
        self.drag.press(cell);
        true
    }

    fn button_release(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if ctl.selection().is_none() || button != MouseButton::Primary || !self.drag.down {
            return false;
        }
        let (x1, y1, x2, y2) = self.drag.release();
        self.paint(ctl, x1, y1, x2, y2);
        true
    }

    fn instructions(&self) -> &str {
        "Left-click to draw tiles on the map. Click and drag to fill an area."
    }
}

/// Clears a dragged rectangle on the selected layer.
#[derive(Default)]
pub struct TileDeleteTool {
    drag: TileDrag,
}

impl TileDeleteTool {
    /// Idle tool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangle being dragged, in map pixels.
    pub fn highlight(&self, tile_size: u32) -> Option<Rect> {
        self.drag.down.then(|| {
            let (x1, y1) = self.drag.start;
            let (x2, y2) = self.drag.end;
            rectangle_select(x1, y1, x2, y2, tile_size)
        })
    }
}

impl EditorTool for TileDeleteTool {
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool {
        let Some(ts) = ctl.tile_size() else {
            return false;
        };
        let p = clamp_to_map(ctl, x, y);
        self.drag.motion(coords_to_tiles(p.x, p.y, ts));
        self.drag.down
    }

    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if !ctl.has_map() || button != MouseButton::Primary {
            return false;
        }
        let cell = self.drag.last.unwrap_or_default();
        self.drag.press(cell);
        true
    }

    fn button_release(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if button != MouseButton::Primary || !self.drag.down {
            return false;
        }
        let (x1, y1, x2, y2) = self.drag.release();
        let Some(z) = ctl.selected_layer() else {
            return true;
        };
        let mut action = TileRemove::new();
        for x in x1..=x2 {
            for y in y1..=y2 {
                if ctl.tile(x, y, z).is_none() {
                    continue;
                }
                if let Some(previous) = ctl.remove_tile(x, y, z) {
                    action.push(x, y, z, previous);
                }
            }
        }
        if !action.is_empty() {
            ctl.add_undo_action(action);
        }
        true
    }

    fn instructions(&self) -> &str {
        "Click and drag to select tiles to delete"
    }
}

/// Selects, moves and reshapes collision shapes.
#[derive(Default)]
pub struct PhysicsSelectTool {
    pointer: Vec2,
    selected: Option<ShapeId>,
    dragging: bool,
    handle: Option<usize>,
    // Outline of the shape when its handle was grabbed
    adjusting: Option<Shape>,
    drag_start: Vec2,
    drag_last: Vec2,
}

impl PhysicsSelectTool {
    /// Tool with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected shape.
    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    /// Removes the selected shape, recording the deletion.
    pub fn delete_selected(&mut self, ctl: &mut MapController) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        self.dragging = false;
        self.handle = None;
        self.adjusting = None;
        match ctl.remove_shape(id) {
            Some((index, shape)) => {
                ctl.add_undo_action(ShapeDelete::new(id, index, shape));
                true
            }
            None => false,
        }
    }

    /// Changes the physical properties of the selected shape.
    pub fn set_selected_material(&mut self, ctl: &mut MapController, material: Material) -> bool {
        match self.selected.filter(|id| ctl.shape(*id).is_some()) {
            Some(id) => {
                ctl.set_shape_material(id, material);
                true
            }
            None => false,
        }
    }

    fn grab_handle(&mut self, ctl: &MapController, id: ShapeId) -> bool {
        let size = ctl.preferences().visual.handle_size;
        let Some(shape) = ctl.shape(id) else {
            return false;
        };
        match shape
            .handles()
            .into_iter()
            .enumerate()
            .find(|(_, h)| point_in_handle(self.pointer, *h, size))
        {
            Some((index, handle)) => {
                self.adjusting = Some(shape.clone());
                self.handle = Some(index);
                self.drag_start = handle;
                self.drag_last = handle;
                true
            }
            None => false,
        }
    }
}

impl EditorTool for PhysicsSelectTool {
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool {
        let p = clamp_to_map(ctl, x, y);
        self.pointer = coords_to_tile_edges(p.x, p.y, 1.0);
        let Some(id) = self.selected else {
            return false;
        };
        let half = half_tile(ctl);
        let snapped = coords_to_tile_edges(self.pointer.x, self.pointer.y, half);

        if let Some(handle) = self.handle {
            ctl.set_shape_snap(id, Some(half));
            ctl.adjust_shape(id, handle, snapped);
            self.drag_last = snapped;
            return true;
        }
        if self.dragging {
            let offset = snapped - self.drag_last;
            if offset != Vec2::ZERO {
                ctl.shift_shape(id, offset);
                self.drag_last = snapped;
                return true;
            }
        }
        false
    }

    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        let hit = ctl.shape_at(self.pointer);
        match button {
            MouseButton::Primary => {
                let on_handle = match self.selected {
                    Some(id) => self.grab_handle(ctl, id),
                    None => false,
                };
                if !on_handle {
                    self.selected = hit;
                    self.dragging = hit.is_some();
                    self.drag_start = coords_to_tile_edges(self.pointer.x, self.pointer.y, half_tile(ctl));
                    self.drag_last = self.drag_start;
                }
            }
            MouseButton::Secondary => self.selected = hit,
        }
        true
    }

    fn button_release(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if button != MouseButton::Primary {
            return false;
        }
        let moved = self.drag_last != self.drag_start;
        let before = self.adjusting.take();
        if let Some(id) = self.selected {
            if self.dragging && moved {
                ctl.add_undo_action(ShapeMove::new(id, self.drag_last - self.drag_start));
            } else if let (Some(before), Some(after)) = (before, ctl.shape(id).cloned()) {
                if before != after {
                    ctl.add_undo_action(ShapeAdjust::new(id, before, after));
                }
            }
        }
        self.dragging = false;
        self.handle = None;
        true
    }

    fn instructions(&self) -> &str {
        "Click and drag to move shapes"
    }
}

/// Draws circles: click for the center, move to size, click to commit.
#[derive(Default)]
pub struct CircleDrawTool {
    pointer: Vec2,
    circle: Option<Circle>,
}

impl CircleDrawTool {
    /// Idle tool.
    pub fn new() -> Self {
        Self::default()
    }

    /// The circle being drawn.
    pub fn preview(&self) -> Option<&Circle> {
        self.circle.as_ref()
    }
}

impl EditorTool for CircleDrawTool {
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool {
        let p = clamp_to_map(ctl, x, y);
        self.pointer = coords_to_tile_edges(p.x, p.y, half_tile(ctl));
        match self.circle.as_mut() {
            Some(circle) => {
                let old = circle.radius();
                circle.adjust(self.pointer);
                circle.radius() != old
            }
            None => false,
        }
    }

    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if let Some(circle) = self.circle.take() {
            if let Some(id) = ctl.add_shape(Shape::Circle(circle)) {
                ctl.add_undo_action(ShapeAdd::new(id));
            }
            return true;
        }
        if button != MouseButton::Primary || !ctl.has_map() {
            return false;
        }
        let half = half_tile(ctl);
        self.circle = Some(Circle::with_snap(self.pointer, half, half).with_material(new_shape_material(ctl)));
        true
    }

    fn button_release(&mut self, _ctl: &mut MapController, _button: MouseButton) -> bool {
        false
    }

    fn instructions(&self) -> &str {
        "Click to set the center point. Click again to set the radius"
    }
}

/// Draws convex polygons vertex by vertex.
pub struct PolygonDrawTool {
    pointer: Vec2,
    polygon: Polygon,
    drawing: bool,
}

impl Default for PolygonDrawTool {
    fn default() -> Self {
        Self {
            pointer: Vec2::ZERO,
            polygon: Polygon::start(),
            drawing: false,
        }
    }
}

impl PolygonDrawTool {
    /// Tool with an empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The outline being drawn, including the vertex under the pointer.
    pub fn preview(&self) -> Option<&Polygon> {
        self.drawing.then_some(&self.polygon)
    }

    fn commit(&mut self, ctl: &mut MapController) {
        let mut polygon = std::mem::replace(&mut self.polygon, Polygon::start());
        self.drawing = false;
        polygon.force_counter_clockwise();
        let polygon = polygon.with_material(new_shape_material(ctl));
        if let Some(id) = ctl.add_shape(Shape::Polygon(polygon)) {
            ctl.add_undo_action(ShapeAdd::new(id));
        }
    }
}

impl EditorTool for PolygonDrawTool {
    fn mouse_motion(&mut self, ctl: &mut MapController, x: f32, y: f32) -> bool {
        let p = clamp_to_map(ctl, x, y);
        let snapped = coords_to_tile_edges(p.x, p.y, half_tile(ctl));
        self.polygon.adjust_last(snapped);
        let changed = snapped != self.pointer;
        self.pointer = snapped;
        changed && self.drawing
    }

    fn button_press(&mut self, ctl: &mut MapController, button: MouseButton) -> bool {
        if !ctl.has_map() {
            return false;
        }
        match button {
            MouseButton::Primary => {
                self.polygon.adjust_last(self.pointer);
                // The pointer vertex duplicates the last placed one here
                let closes = self.drawing
                    && self.polygon.last_point() == Some(self.pointer)
                    && self.polygon.points().len() > 3
                    && self.polygon.is_convex();
                if closes {
                    self.polygon.pop_point();
                    self.commit(ctl);
                } else {
                    self.polygon.add_point(self.pointer);
                    self.drawing = true;
                }
            }
            MouseButton::Secondary => {
                if !self.drawing {
                    return true;
                }
                // The vertex under the pointer becomes the final one unless
                // it sits on the last placed vertex
                let mut outline = self.polygon.clone();
                if outline.last_point() == Some(self.pointer) {
                    outline.pop_point();
                }
                if outline.points().len() >= 3 && outline.is_convex() {
                    self.polygon = outline;
                    self.commit(ctl);
                }
            }
        }
        true
    }

    fn button_release(&mut self, _ctl: &mut MapController, _button: MouseButton) -> bool {
        false
    }

    fn instructions(&self) -> &str {
        "Left click to add points, right click to finish."
    }
}

//! Linear undo history and the editing commands recorded in it.
//!
//! Commands are applied by the caller first and pushed afterwards; `undo`
//! and `redo` then replay their inverse and forward effects against the
//! target, normally a [`MapController`].

use std::collections::BTreeMap;

use macroquad::math::Vec2;

use crate::controller::MapController;
use crate::shapes::Shape;
use crate::tilemap::{Layer, Tile};
use crate::world::ShapeId;

/// A reversible edit of `T`.
pub trait UndoAction<T> {
    /// Reverts the edit.
    fn undo(&mut self, target: &mut T);
    /// Applies the edit again.
    fn redo(&mut self, target: &mut T);
    /// Short lowercase description, e.g. `"move shape"`.
    fn description(&self) -> &str;

    /// `"Undo <description>"`
    fn undo_label(&self) -> String {
        format!("Undo {}", self.description())
    }

    /// `"Redo <description>"`
    fn redo_label(&self) -> String {
        format!("Redo {}", self.description())
    }
}

/// Undo and redo stacks. Pushing a new action drops everything redoable.
pub struct UndoStack<T> {
    undo: Vec<Box<dyn UndoAction<T>>>,
    redo: Vec<Box<dyn UndoAction<T>>>,
}

impl<T> Default for UndoStack<T> {
    fn default() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }
}

impl<T> UndoStack<T> {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an already applied action.
    pub fn push(&mut self, action: Box<dyn UndoAction<T>>) {
        self.redo.clear();
        self.undo.push(action);
    }

    /// Reverts the newest action. Returns false when there is nothing to undo.
    pub fn undo(&mut self, target: &mut T) -> bool {
        match self.undo.pop() {
            Some(mut action) => {
                action.undo(target);
                self.redo.push(action);
                true
            }
            None => false,
        }
    }

    /// Re-applies the newest undone action.
    pub fn redo(&mut self, target: &mut T) -> bool {
        match self.redo.pop() {
            Some(mut action) => {
                action.redo(target);
                self.undo.push(action);
                true
            }
            None => false,
        }
    }

    /// True when there is an action to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// True when there is an undone action to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Menu label for the next undo, if any.
    pub fn undo_description(&self) -> Option<String> {
        self.undo.last().map(|a| a.undo_label())
    }

    /// Menu label for the next redo, if any.
    pub fn redo_description(&self) -> Option<String> {
        self.redo.last().map(|a| a.redo_label())
    }

    /// Forgets all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// A shape was dragged by `offset` pixels.
pub struct ShapeMove {
    id: ShapeId,
    offset: Vec2,
}

impl ShapeMove {
    /// Records a move by `offset`.
    pub fn new(id: ShapeId, offset: Vec2) -> Self {
        Self { id, offset }
    }
}

impl UndoAction<MapController> for ShapeMove {
    fn undo(&mut self, ctl: &mut MapController) {
        ctl.shift_shape(self.id, -self.offset);
    }

    fn redo(&mut self, ctl: &mut MapController) {
        ctl.shift_shape(self.id, self.offset);
    }

    fn description(&self) -> &str {
        "move shape"
    }
}

/// A shape was removed. Holds the shape while it is out of the world.
pub struct ShapeDelete {
    id: ShapeId,
    removed: Option<(usize, Shape)>,
}

impl ShapeDelete {
    /// `index` and `shape` are what [`MapController::remove_shape`] returned.
    pub fn new(id: ShapeId, index: usize, shape: Shape) -> Self {
        Self {
            id,
            removed: Some((index, shape)),
        }
    }
}

impl UndoAction<MapController> for ShapeDelete {
    fn undo(&mut self, ctl: &mut MapController) {
        if let Some((index, shape)) = self.removed.take() {
            ctl.insert_shape(index, self.id, shape);
        }
    }

    fn redo(&mut self, ctl: &mut MapController) {
        self.removed = ctl.remove_shape(self.id);
    }

    fn description(&self) -> &str {
        "delete shape"
    }
}

/// A shape was added.
pub struct ShapeAdd {
    id: ShapeId,
    removed: Option<(usize, Shape)>,
}

impl ShapeAdd {
    /// Records the addition of shape `id`.
    pub fn new(id: ShapeId) -> Self {
        Self { id, removed: None }
    }
}

impl UndoAction<MapController> for ShapeAdd {
    fn undo(&mut self, ctl: &mut MapController) {
        self.removed = ctl.remove_shape(self.id);
    }

    fn redo(&mut self, ctl: &mut MapController) {
        if let Some((index, shape)) = self.removed.take() {
            ctl.insert_shape(index, self.id, shape);
        }
    }

    fn description(&self) -> &str {
        "add shape"
    }
}

/// A handle of a shape was dragged. Both outlines are kept whole, so a
/// circle's radius and snap come back exactly.
pub struct ShapeAdjust {
    id: ShapeId,
    before: Shape,
    after: Shape,
}

impl ShapeAdjust {
    /// Records shape `id` changing from `before` to `after`.
    pub fn new(id: ShapeId, before: Shape, after: Shape) -> Self {
        Self { id, before, after }
    }
}

impl UndoAction<MapController> for ShapeAdjust {
    fn undo(&mut self, ctl: &mut MapController) {
        ctl.replace_shape(self.id, self.before.clone());
    }

    fn redo(&mut self, ctl: &mut MapController) {
        ctl.replace_shape(self.id, self.after.clone());
    }

    fn description(&self) -> &str {
        "adjust shape"
    }
}

type Cell = (usize, usize, usize);

/// A batch of painted cells, undone as one step.
#[derive(Default)]
pub struct TileAdd {
    added: BTreeMap<Cell, Tile>,
    previous: BTreeMap<Cell, Option<Tile>>,
}

impl TileAdd {
    /// Empty action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `tile` replaced `previous` at `(x, y, z)`. Painting the
    /// same cell twice keeps the first previous tile.
    pub fn push(&mut self, x: usize, y: usize, z: usize, tile: Tile, previous: Option<Tile>) {
        self.added.insert((x, y, z), tile);
        self.previous.entry((x, y, z)).or_insert(previous);
    }

    /// True when no cell was recorded.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// Number of recorded cells.
    pub fn len(&self) -> usize {
        self.added.len()
    }
}

impl UndoAction<MapController> for TileAdd {
    fn undo(&mut self, ctl: &mut MapController) {
        for (&(x, y, z), previous) in &self.previous {
            match previous {
                Some(tile) => {
                    ctl.add_tile(x, y, z, *tile);
                }
                None => {
                    ctl.remove_tile(x, y, z);
                }
            }
        }
    }

    fn redo(&mut self, ctl: &mut MapController) {
        for (&(x, y, z), tile) in &self.added {
            ctl.add_tile(x, y, z, *tile);
        }
    }

    fn description(&self) -> &str {
        "add tiles"
    }
}

/// A batch of cleared cells, undone as one step.
#[derive(Default)]
pub struct TileRemove {
    removed: BTreeMap<Cell, Tile>,
}

impl TileRemove {
    /// Empty action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `previous` was cleared from `(x, y, z)`. Only the first
    /// removal of a cell counts.
    pub fn push(&mut self, x: usize, y: usize, z: usize, previous: Tile) {
        self.removed.entry((x, y, z)).or_insert(previous);
    }

    /// True when no cell was recorded.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    /// Number of recorded cells.
    pub fn len(&self) -> usize {
        self.removed.len()
    }
}

impl UndoAction<MapController> for TileRemove {
    fn undo(&mut self, ctl: &mut MapController) {
        for (&(x, y, z), tile) in &self.removed {
            ctl.add_tile(x, y, z, *tile);
        }
    }

    fn redo(&mut self, ctl: &mut MapController) {
        for &(x, y, z) in self.removed.keys() {
            ctl.remove_tile(x, y, z);
        }
    }

    fn description(&self) -> &str {
        "remove tiles"
    }
}

/// The map was resized. Tiles pushed off the map are kept so undo can put
/// them back.
pub struct Resize {
    width: usize,
    height: usize,
    x_offset: i32,
    y_offset: i32,
    old_width: usize,
    old_height: usize,
    clipped: TileRemove,
}

impl Resize {
    /// Must be built before the resize is applied, while the clipped tiles
    /// still exist.
    pub fn new(ctl: &MapController, width: usize, height: usize, x_offset: i32, y_offset: i32) -> Self {
        let mut clipped = TileRemove::new();
        let (old_width, old_height) = match ctl.map() {
            Some(map) => {
                let inside = |v: usize, offset: i32, limit: usize| {
                    let moved = v as i64 + offset as i64;
                    moved >= 0 && moved < limit as i64
                };
                for (z, layer) in map.layers.iter().enumerate() {
                    for (x, y, tile) in layer.tiles() {
                        if !inside(x, x_offset, width) || !inside(y, y_offset, height) {
                            clipped.push(x, y, z, tile);
                        }
                    }
                }
                (map.width, map.height)
            }
            None => (width, height),
        };
        Self {
            width,
            height,
            x_offset,
            y_offset,
            old_width,
            old_height,
            clipped,
        }
    }
}

impl UndoAction<MapController> for Resize {
    fn undo(&mut self, ctl: &mut MapController) {
        ctl.resize(self.old_width, self.old_height, -self.x_offset, -self.y_offset);
        self.clipped.undo(ctl);
    }

    fn redo(&mut self, ctl: &mut MapController) {
        self.clipped.redo(ctl);
        ctl.resize(self.width, self.height, self.x_offset, self.y_offset);
    }

    fn description(&self) -> &str {
        "resize map"
    }
}

/// A layer was removed.
pub struct LayerRemove {
    index: usize,
    layer: Option<Layer>,
}

impl LayerRemove {
    /// Removes layer `index` and returns the action recording it, or `None`
    /// when there is no such layer.
    pub fn apply(ctl: &mut MapController, index: usize) -> Option<Self> {
        let layer = ctl.remove_layer(index)?;
        Some(Self {
            index,
            layer: Some(layer),
        })
    }
}

impl UndoAction<MapController> for LayerRemove {
    fn undo(&mut self, ctl: &mut MapController) {
        if let Some(layer) = self.layer.take() {
            ctl.insert_layer(layer, self.index);
        }
    }

    fn redo(&mut self, ctl: &mut MapController) {
        self.layer = ctl.remove_layer(self.index);
    }

    fn description(&self) -> &str {
        "remove layer"
    }
}

/// A visible layer was appended.
pub struct LayerAdd {
    index: usize,
    name: String,
}

impl LayerAdd {
    /// Appends a layer named `name` and returns the action recording it.
    pub fn apply(ctl: &mut MapController, name: &str) -> Option<Self> {
        let index = ctl.add_layer(name, true)?;
        Some(Self {
            index,
            name: name.to_string(),
        })
    }
}

impl UndoAction<MapController> for LayerAdd {
    fn undo(&mut self, ctl: &mut MapController) {
        ctl.remove_layer(self.index);
    }

    fn redo(&mut self, ctl: &mut MapController) {
        if let Some(index) = ctl.add_layer(&self.name, true) {
            self.index = index;
        }
    }

    fn description(&self) -> &str {
        "add layer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Circle;
    use macroquad::math::vec2;

    struct Append(i32);

    impl UndoAction<Vec<i32>> for Append {
        fn undo(&mut self, target: &mut Vec<i32>) {
            target.pop();
        }

        fn redo(&mut self, target: &mut Vec<i32>) {
            target.push(self.0);
        }

        fn description(&self) -> &str {
            "append"
        }
    }

    fn pushed(stack: &mut UndoStack<Vec<i32>>, target: &mut Vec<i32>, v: i32) {
        target.push(v);
        stack.push(Box::new(Append(v)));
    }

    #[test]
    fn undo_and_redo_move_between_stacks() {
        let mut stack = UndoStack::new();
        let mut values = Vec::new();
        assert!(!stack.undo(&mut values));
        pushed(&mut stack, &mut values, 1);
        pushed(&mut stack, &mut values, 2);

        assert!(stack.undo(&mut values));
        assert_eq!(values, [1]);
        assert_eq!(stack.redo_description().as_deref(), Some("Redo append"));
        assert!(stack.redo(&mut values));
        assert_eq!(values, [1, 2]);
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_description().as_deref(), Some("Undo append"));
    }

    #[test]
    fn push_clears_redo() {
        let mut stack = UndoStack::new();
        let mut values = Vec::new();
        pushed(&mut stack, &mut values, 1);
        stack.undo(&mut values);
        assert!(stack.can_redo());
        pushed(&mut stack, &mut values, 5);
        assert!(!stack.can_redo());
        assert_eq!(stack.redo_description(), None);
    }

    #[test]
    fn tile_add_keeps_first_previous_tile() {
        let mut action = TileAdd::new();
        let original = Tile::new(9, 9, 0);
        action.push(0, 0, 0, Tile::new(1, 0, 0), Some(original));
        action.push(0, 0, 0, Tile::new(2, 0, 0), Some(Tile::new(1, 0, 0)));
        assert_eq!(action.len(), 1);
        assert_eq!(action.previous[&(0, 0, 0)], Some(original));
        assert_eq!(action.added[&(0, 0, 0)], Tile::new(2, 0, 0));
    }

    #[test]
    fn shape_commands_round_trip_through_controller() {
        let mut ctl = MapController::new();
        ctl.new_map(32, 4, 4);
        let id = ctl
            .add_shape(Circle::new(vec2(16.0, 16.0), 8.0).into())
            .expect("map open");
        let before = ctl.world().cloned();

        ctl.shift_shape(id, vec2(32.0, 0.0));
        ctl.add_undo_action(ShapeMove::new(id, vec2(32.0, 0.0)));
        let (index, shape) = ctl.remove_shape(id).expect("shape exists");
        ctl.add_undo_action(ShapeDelete::new(id, index, shape));

        assert!(ctl.undo());
        assert!(ctl.undo());
        assert_eq!(ctl.world().cloned(), before);

        assert!(ctl.redo());
        assert!(ctl.redo());
        assert!(ctl.world().map_or(false, |w| w.is_empty()));
        assert!(ctl.undo());
        assert_eq!(ctl.world().and_then(|w| w.shape(id)).map(Shape::center), Some(vec2(48.0, 16.0)));
    }

    #[test]
    fn resize_undo_restores_clipped_tiles() {
        let mut ctl = MapController::new();
        ctl.new_map(16, 4, 4);
        ctl.add_tile(3, 3, 0, Tile::new(1, 1, 0));
        ctl.add_tile(0, 0, 0, Tile::new(2, 2, 0));
        let before = ctl.map().cloned();

        let action = Resize::new(&ctl, 2, 2, 0, 0);
        ctl.resize(2, 2, 0, 0);
        ctl.add_undo_action(action);
        assert_eq!(ctl.tile(0, 0, 0), Some(Tile::new(2, 2, 0)));

        assert!(ctl.undo());
        assert_eq!(ctl.map().cloned(), before);
        assert!(ctl.redo());
        assert_eq!(ctl.map().map(|m| (m.width, m.height)), Some((2, 2)));
    }

    #[test]
    fn layer_commands_undo_after_redo_restore_state() {
        let mut ctl = MapController::new();
        ctl.new_map(16, 2, 2);
        ctl.add_tile(1, 1, 0, Tile::new(0, 0, 0));
        let before = ctl.map().cloned();

        let added = LayerAdd::apply(&mut ctl, "Top").expect("map open");
        ctl.add_undo_action(added);
        let removed = LayerRemove::apply(&mut ctl, 0).expect("layer exists");
        ctl.add_undo_action(removed);
        let after = ctl.map().cloned();

        assert!(ctl.undo());
        assert!(ctl.undo());
        assert_eq!(ctl.map().cloned(), before);
        assert!(ctl.redo());
        assert!(ctl.redo());
        assert_eq!(ctl.map().cloned(), after);
        assert!(ctl.undo());
        assert!(ctl.undo());
        assert_eq!(ctl.map().cloned(), before);
    }
}

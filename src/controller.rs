//! The editor's central mediator.
//!
//! [`MapController`] owns the open level and is the only thing that mutates
//! it. Every change is announced to the registered [`MapListener`]s so that
//! views can stay in sync without reaching into the model.

use std::path::{Path, PathBuf};

use log::{debug, error, info};
use macroquad::color::Color;
use macroquad::math::Vec2;

use crate::background::{Background, ParallaxLayer};
use crate::error::LevelError;
use crate::loader::level_io::{read_level, write_level, Level};
use crate::preferences::Preferences;
use crate::shapes::{Material, Shape};
use crate::tilemap::{Layer, Tile, TileMap};
use crate::undo::{UndoAction, UndoStack};
use crate::world::{BlazeWorld, ShapeId};

/// A rectangle of tiles inside one tileset image, used as the paint brush.
/// Corners are inclusive and normalized so that `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSelection {
    /// Tileset image
    pub image_index: usize,
    /// Left column
    pub x1: u32,
    /// Top row
    pub y1: u32,
    /// Right column
    pub x2: u32,
    /// Bottom row
    pub y2: u32,
}

impl TileSelection {
    /// Width in tiles.
    pub fn width(&self) -> u32 {
        self.x2 - self.x1 + 1
    }

    /// Height in tiles.
    pub fn height(&self) -> u32 {
        self.y2 - self.y1 + 1
    }

    /// Tile at offset `(dx, dy)` inside the selection, wrapping around.
    pub fn tile(&self, dx: u32, dy: u32) -> Tile {
        Tile::new(
            self.x1 + dx % self.width(),
            self.y1 + dy % self.height(),
            self.image_index as u32,
        )
    }
}

/// Change notifications sent to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A layer was shown or hidden
    LayerVisibility {
        /// Layer index
        index: usize,
        /// New visibility
        visible: bool,
    },
    /// The map was resized (in tiles)
    Resized {
        /// New width
        width: usize,
        /// New height
        height: usize,
        /// Horizontal shift of existing tiles
        x_offset: i32,
        /// Vertical shift of existing tiles
        y_offset: i32,
    },
    /// A layer was added or re-inserted
    LayerAdded {
        /// Its name
        name: String,
    },
    /// A cell was painted
    TileAdded {
        /// New tile
        tile: Tile,
        /// Column
        x: usize,
        /// Row
        y: usize,
        /// Layer
        z: usize,
    },
    /// A cell was cleared
    TileRemoved {
        /// Column
        x: usize,
        /// Row
        y: usize,
        /// Layer
        z: usize,
    },
    /// A layer was removed
    LayerRemoved {
        /// Its former index
        index: usize,
    },
    /// Two layers changed places
    LayersSwapped(usize, usize),
    /// The selected layer changed
    LayerSelected(Option<usize>),
    /// The unsaved-changes flag changed
    Modified(bool),
    /// The level was closed
    FileClosed,
    /// A level was opened or created
    FileOpened,
    /// The paint brush changed
    SelectionChanged(TileSelection),
    /// A tileset image became available
    TileSetAdded(String),
    /// An action was undone, redone or recorded
    UndoRedo,
    /// A shape entered the world
    ShapeAdded(ShapeId),
    /// A shape left the world
    ShapeRemoved(ShapeId),
}

/// Receives [`MapEvent`]s from a controller.
pub trait MapListener {
    /// Called after the change has been applied.
    fn on_event(&mut self, event: &MapEvent);
}

impl<F: FnMut(&MapEvent)> MapListener for F {
    fn on_event(&mut self, event: &MapEvent) {
        self(event)
    }
}

/// Owns the open level, its undo history and the user's preferences.
pub struct MapController {
    map: Option<TileMap>,
    world: Option<BlazeWorld>,
    background: Option<Background>,
    file_name: Option<PathBuf>,
    modified: bool,
    selected_layer: Option<usize>,
    selection: Option<TileSelection>,
    history: UndoStack<MapController>,
    prefs: Preferences,
    listeners: Vec<Box<dyn MapListener>>,
    /// Write the background section on save
    pub save_background: bool,
    /// Write the collision world on save
    pub save_world: bool,
}

impl Default for MapController {
    fn default() -> Self {
        Self::with_preferences(Preferences::default())
    }
}

impl MapController {
    /// Controller with default preferences and nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller using `prefs`, e.g. from [`Preferences::load`].
    pub fn with_preferences(prefs: Preferences) -> Self {
        Self {
            map: None,
            world: None,
            background: None,
            file_name: None,
            modified: false,
            selected_layer: None,
            selection: None,
            history: UndoStack::new(),
            prefs,
            listeners: Vec::new(),
            save_background: true,
            save_world: true,
        }
    }

    /// Registers a listener for all future events.
    pub fn add_listener(&mut self, listener: impl MapListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: MapEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }

    fn notify_modification(&mut self, modified: bool) {
        self.modified = modified;
        self.emit(MapEvent::Modified(modified));
    }

    fn map_mut(&mut self) -> Option<&mut TileMap> {
        if self.map.is_none() {
            error!("No map is open");
        }
        self.map.as_mut()
    }

    fn world_mut(&mut self) -> Option<&mut BlazeWorld> {
        if self.world.is_none() {
            error!("No collision world is open");
        }
        self.world.as_mut()
    }

    fn background_mut(&mut self) -> Option<&mut Background> {
        if self.background.is_none() {
            error!("No background is open");
        }
        self.background.as_mut()
    }

    // ---- Level lifecycle ----

    /// True while a level is open.
    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    /// The open tile map.
    pub fn map(&self) -> Option<&TileMap> {
        self.map.as_ref()
    }

    /// Collision shapes of the open level.
    pub fn world(&self) -> Option<&BlazeWorld> {
        self.world.as_ref()
    }

    /// Background of the open level.
    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// Editor preferences.
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Editor preferences, for changing.
    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.prefs
    }

    /// Path the level is saved to.
    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    /// Sets the path used by [`MapController::save`].
    pub fn set_file_name<P: Into<PathBuf>>(&mut self, path: P) {
        self.file_name = Some(path.into());
    }

    /// Starts an empty level. The new map's only layer is selected.
    pub fn new_map(&mut self, tile_size: u32, width: usize, height: usize) {
        self.close();
        let map = TileMap::create(tile_size, width, height);
        self.selected_layer = map.layers.len().checked_sub(1);
        self.map = Some(map);
        self.world = Some(BlazeWorld::new());
        self.background = Some(Background::default());
        info!("Created a {}x{} map with {}px tiles", width, height, tile_size);
        self.emit(MapEvent::FileOpened);
        self.emit(MapEvent::LayerSelected(self.selected_layer));
    }

    /// Closes the current level and opens `path`. Missing background and
    /// world sections become empty ones; the last layer is selected.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LevelError> {
        self.close();
        let path = path.as_ref();
        let Level {
            background,
            tile_map,
            world,
        } = read_level(path, &self.prefs.files)?;

        let images: Vec<String> = tile_map.images.iter().flatten().cloned().collect();
        self.selected_layer = tile_map.layers.len().checked_sub(1);
        self.map = Some(tile_map);
        self.world = Some(world.unwrap_or_default());
        self.background = Some(background.unwrap_or_default());
        self.file_name = Some(path.to_path_buf());

        for image in images {
            self.emit(MapEvent::TileSetAdded(image));
        }
        self.emit(MapEvent::FileOpened);
        self.emit(MapEvent::LayerSelected(self.selected_layer));
        Ok(())
    }

    /// Drops the open level and its history. Does nothing when no level is open.
    pub fn close(&mut self) {
        if self.map.is_none() {
            return;
        }
        self.map = None;
        self.world = None;
        self.background = None;
        self.file_name = None;
        self.modified = false;
        self.selected_layer = None;
        self.selection = None;
        self.history.clear();
        debug!("Closed level");
        self.emit(MapEvent::FileClosed);
    }

    /// Writes the level to its file name.
    pub fn save(&mut self) -> Result<(), LevelError> {
        let path = self.file_name.clone().ok_or(LevelError::Unnamed)?;
        let map = self.map.as_ref().ok_or(LevelError::MissingTileMap)?;
        let world = self.world.as_ref().filter(|_| self.save_world);
        let background = self.background.as_ref().filter(|_| self.save_background);
        write_level(&path, map, world, background, &self.prefs.files)?;
        info!("Saved level to {}", path.display());
        self.notify_modification(false);
        Ok(())
    }

    /// Renames the level and writes it.
    pub fn save_as<P: Into<PathBuf>>(&mut self, path: P) -> Result<(), LevelError> {
        self.set_file_name(path);
        self.save()
    }

    /// True when a level is open and has changes not yet written.
    pub fn unsaved(&self) -> bool {
        self.map.is_some() && self.modified
    }

    // ---- Map ----

    /// Tile size of the open map, in pixels.
    pub fn tile_size(&self) -> Option<u32> {
        self.map.as_ref().map(|m| m.tile_size)
    }

    /// Resizes the map in tiles and shifts the world by the same amount in
    /// pixels.
    pub fn resize(&mut self, width: usize, height: usize, x_offset: i32, y_offset: i32) {
        if width == 0 || height == 0 {
            error!("Tried to resize the map to {}x{}", width, height);
            return;
        }
        let Some(map) = self.map_mut() else {
            return;
        };
        map.resize(width, height, x_offset, y_offset);
        let ts = map.tile_size as f32;
        if let Some(world) = self.world.as_mut() {
            world.resize(
                width as f32 * ts,
                height as f32 * ts,
                x_offset as f32 * ts,
                y_offset as f32 * ts,
            );
        }
        self.emit(MapEvent::Resized {
            width,
            height,
            x_offset,
            y_offset,
        });
        self.notify_modification(true);
    }

    /// Tile at column `x`, row `y` of layer `z`.
    pub fn tile(&self, x: usize, y: usize, z: usize) -> Option<Tile> {
        self.map.as_ref().and_then(|m| m.tile(x, y, z))
    }

    /// Paints a cell and returns the tile it replaced.
    pub fn add_tile(&mut self, x: usize, y: usize, z: usize, tile: Tile) -> Option<Tile> {
        let previous = self.map_mut()?.set_tile(tile, x, y, z);
        self.emit(MapEvent::TileAdded { tile, x, y, z });
        self.notify_modification(true);
        previous
    }

    /// Clears a cell and returns what was there.
    pub fn remove_tile(&mut self, x: usize, y: usize, z: usize) -> Option<Tile> {
        let previous = self.map_mut()?.remove_tile(x, y, z);
        self.emit(MapEvent::TileRemoved { x, y, z });
        self.notify_modification(true);
        previous
    }

    // ---- Layers ----

    /// Number of layers, zero without a map.
    pub fn num_layers(&self) -> usize {
        self.map.as_ref().map_or(0, |m| m.layers.len())
    }

    /// Name and visibility of every layer, bottom first.
    pub fn layer_info(&self) -> Vec<(String, bool)> {
        self.map
            .as_ref()
            .map(|m| m.layers.iter().map(|l| (l.name.clone(), l.visible)).collect())
            .unwrap_or_default()
    }

    /// Appends a layer and selects it.
    pub fn add_layer(&mut self, name: &str, visible: bool) -> Option<usize> {
        let index = self.map_mut()?.add_layer(name, visible, None);
        self.selected_layer = Some(index);
        self.emit(MapEvent::LayerAdded {
            name: name.to_string(),
        });
        self.emit(MapEvent::LayerSelected(Some(index)));
        self.notify_modification(true);
        Some(index)
    }

    /// Puts an existing layer back at `index`.
    pub fn insert_layer(&mut self, layer: Layer, index: usize) {
        let name = layer.name.clone();
        let Some(map) = self.map_mut() else {
            return;
        };
        map.insert_layer(layer, index);
        self.emit(MapEvent::LayerAdded { name });
        self.notify_modification(true);
    }

    /// Removes a layer. The selection moves down when it pointed past the end.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        let map = self.map_mut()?;
        let layer = map.remove_layer(index)?;
        let len = map.layers.len();
        self.emit(MapEvent::LayerRemoved { index });
        if self.selected_layer.map_or(false, |s| s >= len) {
            self.selected_layer = len.checked_sub(1);
            self.emit(MapEvent::LayerSelected(self.selected_layer));
        }
        self.notify_modification(true);
        Some(layer)
    }

    /// Exchanges two layers. Out-of-range indices are ignored.
    pub fn swap_layers(&mut self, a: usize, b: usize) {
        let Some(map) = self.map_mut() else {
            return;
        };
        if a >= map.layers.len() || b >= map.layers.len() {
            error!("Cannot swap layers {} and {} of {}", a, b, map.layers.len());
            return;
        }
        map.swap_layers(a, b);
        self.emit(MapEvent::LayersSwapped(a, b));
        self.notify_modification(true);
    }

    /// Layer the tools paint on.
    pub fn selected_layer(&self) -> Option<usize> {
        self.selected_layer
    }

    /// Selects layer `index` if it exists.
    pub fn select_layer(&mut self, index: usize) {
        if index >= self.num_layers() {
            error!("Cannot select layer {}: there are {} layers", index, self.num_layers());
            return;
        }
        self.selected_layer = Some(index);
        self.emit(MapEvent::LayerSelected(Some(index)));
    }

    /// Whether layer `index` is shown.
    pub fn layer_visibility(&self, index: usize) -> Option<bool> {
        self.map.as_ref()?.layers.get(index).map(|l| l.visible)
    }

    /// Shows or hides a layer.
    pub fn set_layer_visibility(&mut self, index: usize, visible: bool) {
        let Some(layer) = self.map_mut().and_then(|m| m.layers.get_mut(index)) else {
            error!("Cannot change visibility of layer {}", index);
            return;
        };
        layer.visible = visible;
        self.emit(MapEvent::LayerVisibility { index, visible });
        self.notify_modification(true);
    }

    /// Renames a layer.
    pub fn set_layer_name(&mut self, index: usize, name: &str) {
        let Some(layer) = self.map_mut().and_then(|m| m.layers.get_mut(index)) else {
            error!("Cannot rename layer {}", index);
            return;
        };
        layer.name = name.to_string();
        self.notify_modification(true);
    }

    // ---- Tilesets and brush ----

    /// Adds an image file as a new tileset and returns its index.
    pub fn open_tileset(&mut self, file_name: &str) -> Result<usize, LevelError> {
        if !Path::new(file_name).exists() {
            return Err(LevelError::NotFound(PathBuf::from(file_name)));
        }
        let map = self.map.as_mut().ok_or(LevelError::MissingTileMap)?;
        let index = map.images.len();
        map.add_image(file_name, index);
        self.emit(MapEvent::TileSetAdded(file_name.to_string()));
        self.notify_modification(true);
        Ok(index)
    }

    /// File name of tileset `index`.
    pub fn tileset(&self, index: usize) -> Option<&str> {
        self.map.as_ref()?.images.get(index)?.as_deref()
    }

    /// Sets the paint brush to a rectangle of tileset `image_index`.
    /// Corners may be given in any order.
    pub fn set_selection(&mut self, image_index: usize, x1: u32, y1: u32, x2: u32, y2: u32) {
        if self.tileset(image_index).is_none() {
            error!("Cannot select from tileset {}: it is not open", image_index);
            return;
        }
        let selection = TileSelection {
            image_index,
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        };
        self.selection = Some(selection);
        self.emit(MapEvent::SelectionChanged(selection));
    }

    /// Current paint brush.
    pub fn selection(&self) -> Option<TileSelection> {
        self.selection
    }

    // ---- Shapes ----

    /// Adds a shape and returns its handle.
    pub fn add_shape(&mut self, shape: Shape) -> Option<ShapeId> {
        let id = self.world_mut()?.add_shape(shape);
        self.emit(MapEvent::ShapeAdded(id));
        self.notify_modification(true);
        Some(id)
    }

    /// Restores a removed shape at its old position and id.
    pub fn insert_shape(&mut self, index: usize, id: ShapeId, shape: Shape) {
        let Some(world) = self.world_mut() else {
            return;
        };
        world.insert_shape(index, id, shape);
        self.emit(MapEvent::ShapeAdded(id));
        self.notify_modification(true);
    }

    /// Removes a shape, returning its former position and the shape.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<(usize, Shape)> {
        let removed = self.world_mut()?.remove_shape(id)?;
        self.emit(MapEvent::ShapeRemoved(id));
        self.notify_modification(true);
        Some(removed)
    }

    /// Shape with handle `id`.
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.world.as_ref()?.shape(id)
    }

    /// Topmost-first is not guaranteed; returns the first shape in world
    /// order that contains `p`.
    pub fn shape_at(&self, p: Vec2) -> Option<ShapeId> {
        self.world.as_ref()?.shape_at(p)
    }

    fn edit_shape(&mut self, id: ShapeId, edit: impl FnOnce(&mut Shape)) {
        match self.world_mut().and_then(|w| w.shape_mut(id)) {
            Some(shape) => {
                edit(shape);
                self.notify_modification(true);
            }
            None => error!("No shape with id {:?}", id),
        }
    }

    /// Moves a shape by `offset`.
    pub fn shift_shape(&mut self, id: ShapeId, offset: Vec2) {
        self.edit_shape(id, |s| s.shift(offset));
    }

    /// Drags handle `handle` of a shape to `p`.
    pub fn adjust_shape(&mut self, id: ShapeId, handle: usize, p: Vec2) {
        self.edit_shape(id, |s| s.adjust(handle, p));
    }

    /// Swaps in a new outline for shape `id`, keeping its place in the world.
    pub fn replace_shape(&mut self, id: ShapeId, shape: Shape) {
        self.edit_shape(id, |s| *s = shape);
    }

    /// Sets the radius snap of a circle. Polygons are left alone.
    pub fn set_shape_snap(&mut self, id: ShapeId, snap: Option<f32>) {
        if let Some(Shape::Circle(circle)) = self.world.as_mut().and_then(|w| w.shape_mut(id)) {
            circle.set_snap(snap);
        }
    }

    /// Changes a shape's physical properties.
    pub fn set_shape_material(&mut self, id: ShapeId, material: Material) {
        self.edit_shape(id, |s| *s.material_mut() = material);
    }

    /// Sets the world gravity vector.
    pub fn set_gravity(&mut self, gravity: Vec2) {
        if let Some(world) = self.world_mut() {
            world.gravity = gravity;
            self.notify_modification(true);
        }
    }

    // ---- Background ----

    /// Background fill color.
    pub fn bg_color(&self) -> Option<Color> {
        self.background.as_ref().map(|b| b.color)
    }

    /// Changes the background fill color.
    pub fn set_bg_color(&mut self, color: Color) {
        if let Some(background) = self.background_mut() {
            background.color = color;
            self.notify_modification(true);
        }
    }

    /// Parallax layers of the background.
    pub fn parallaxes(&self) -> Option<&[ParallaxLayer]> {
        self.background.as_ref().map(|b| b.parallaxes.as_slice())
    }

    /// Replaces the parallax layers.
    pub fn set_parallaxes(&mut self, parallaxes: Vec<ParallaxLayer>) {
        if let Some(background) = self.background_mut() {
            background.parallaxes = parallaxes;
            self.notify_modification(true);
        }
    }

    // ---- History ----

    /// Records an action that has already been applied.
    pub fn add_undo_action<A: UndoAction<MapController> + 'static>(&mut self, action: A) {
        debug!("Recorded \"{}\"", action.description());
        self.history.push(Box::new(action));
        self.notify_modification(true);
        self.emit(MapEvent::UndoRedo);
    }

    /// Reverts the last action. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let mut history = std::mem::take(&mut self.history);
        let done = history.undo(self);
        self.history = history;
        let modified = self.history.can_undo();
        self.notify_modification(modified);
        self.emit(MapEvent::UndoRedo);
        done
    }

    /// Reapplies the last undone action.
    pub fn redo(&mut self) -> bool {
        let mut history = std::mem::take(&mut self.history);
        let done = history.redo(self);
        self.history = history;
        self.notify_modification(true);
        self.emit(MapEvent::UndoRedo);
        done
    }

    /// True when there is an action to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// True when there is an undone action to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Menu label for undo, e.g. `"Undo add tiles"`.
    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    /// Menu label for redo.
    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }
}

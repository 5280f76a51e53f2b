//! In-memory tile grid: layers of optional tile references.

use log::error;

/// Reference to a tile-sized rectangle of a tileset image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Column of the source rect, in tiles
    pub image_x: u32,
    /// Row of the source rect, in tiles
    pub image_y: u32,
    /// Index into [`TileMap::images`]
    pub image_index: u32,
}

impl Tile {
    /// New tile reference.
    pub fn new(image_x: u32, image_y: u32, image_index: u32) -> Self {
        Self {
            image_x,
            image_y,
            image_index,
        }
    }
}

/// One grid of tiles, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Display name
    pub name: String,
    /// Hidden layers are still saved
    pub visible: bool,
    width: usize,
    height: usize,
    tiles: Vec<Option<Tile>>,
}

impl Layer {
    /// Empty visible layer named "New Layer".
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            name: "New Layer".to_string(),
            visible: true,
            width,
            height,
            tiles: vec![None; width * height],
        }
    }

    /// Width in tiles.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Tile at `(x, y)`, `None` for empty or out-of-range cells.
    pub fn tile(&self, x: usize, y: usize) -> Option<Tile> {
        self.index(x, y).and_then(|i| self.tiles[i])
    }

    /// Places `tile` and returns the tile it replaced.
    pub fn set_tile(&mut self, tile: Tile, x: usize, y: usize) -> Option<Tile> {
        let i = self.index(x, y)?;
        self.tiles[i].replace(tile)
    }

    /// Clears a cell and returns what was there.
    pub fn remove_tile(&mut self, x: usize, y: usize) -> Option<Tile> {
        let i = self.index(x, y)?;
        self.tiles[i].take()
    }

    /// Occupied cells as `(x, y, tile)` in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        let w = self.width.max(1);
        self.tiles
            .iter()
            .enumerate()
            .filter_map(move |(i, t)| t.map(|t| (i % w, i / w, t)))
    }

    /// Number of occupied cells.
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_some()).count()
    }

    /// Reallocates the grid, shifting existing tiles by the offsets and
    /// dropping those that fall outside.
    pub fn resize(&mut self, width: usize, height: usize, x_offset: i32, y_offset: i32) {
        if width == 0 || height == 0 {
            error!("Tried to resize a layer to have a zero dimension");
            return;
        }
        let mut tiles = vec![None; width * height];
        for (x, y, tile) in self.tiles() {
            let nx = x as i64 + x_offset as i64;
            let ny = y as i64 + y_offset as i64;
            if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height {
                tiles[ny as usize * width + nx as usize] = Some(tile);
            }
        }
        self.tiles = tiles;
        self.width = width;
        self.height = height;
    }
}

/// The tile portion of a level.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    /// Width in tiles
    pub width: usize,
    /// Height in tiles
    pub height: usize,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Layers in paint order
    pub layers: Vec<Layer>,
    /// Tileset image file names, indexed by [`Tile::image_index`]
    pub images: Vec<Option<String>>,
}

impl Default for TileMap {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            tile_size: 32,
            layers: Vec::new(),
            images: Vec::new(),
        }
    }
}

impl TileMap {
    /// Map of the given size with a single visible layer.
    pub fn create(tile_size: u32, width: usize, height: usize) -> Self {
        let mut map = Self {
            width,
            height,
            tile_size,
            ..Self::default()
        };
        map.add_layer("New Layer", true, None);
        map
    }

    /// Width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.width as u32 * self.tile_size
    }

    /// Height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.height as u32 * self.tile_size
    }

    /// Resizes every layer. Offsets shift existing tiles right and down and
    /// may be negative.
    pub fn resize(&mut self, width: usize, height: usize, x_offset: i32, y_offset: i32) {
        if width == self.width && height == self.height && x_offset == 0 && y_offset == 0 {
            return;
        }
        if width == 0 || height == 0 {
            error!("Tried to resize the map to have a zero dimension");
            return;
        }
        for layer in &mut self.layers {
            layer.resize(width, height, x_offset, y_offset);
        }
        self.width = width;
        self.height = height;
    }

    /// Tile at `(x, y)` on layer `z`.
    pub fn tile(&self, x: usize, y: usize, z: usize) -> Option<Tile> {
        self.layers.get(z).and_then(|l| l.tile(x, y))
    }

    /// Places a tile and returns the one it replaced. Cells outside the map
    /// are ignored; missing layers up to `z` are created.
    pub fn set_tile(&mut self, tile: Tile, x: usize, y: usize, z: usize) -> Option<Tile> {
        if x >= self.width || y >= self.height {
            // The paint area is often larger than the map
            return None;
        }
        while z >= self.layers.len() {
            self.layers.push(Layer::new(self.width, self.height));
        }
        self.layers[z].set_tile(tile, x, y)
    }

    /// Clears a cell and returns what was there.
    pub fn remove_tile(&mut self, x: usize, y: usize, z: usize) -> Option<Tile> {
        let Some(layer) = self.layers.get_mut(z) else {
            return None;
        };
        if x >= self.width || y >= self.height {
            error!("remove_tile: ({}, {}) is outside the {}x{} map", x, y, self.width, self.height);
            return None;
        }
        layer.remove_tile(x, y)
    }

    /// Adds a layer. With `Some(index)` the layer list is extended up to
    /// `index` and that layer is renamed; otherwise the layer is appended.
    /// Returns the index of the named layer.
    pub fn add_layer(&mut self, name: &str, visible: bool, index: Option<usize>) -> usize {
        let z = match index {
            Some(z) => {
                while z >= self.layers.len() {
                    self.layers.push(Layer::new(self.width, self.height));
                }
                z
            }
            None => {
                self.layers.push(Layer::new(self.width, self.height));
                self.layers.len() - 1
            }
        };
        self.layers[z].name = name.to_string();
        self.layers[z].visible = visible;
        z
    }

    /// Inserts an existing layer at `index`, clamped to the end.
    pub fn insert_layer(&mut self, layer: Layer, index: usize) {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
    }

    /// Removes and returns a layer.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            error!("Tried to remove a non-existent layer {}", index);
            return None;
        }
        Some(self.layers.remove(index))
    }

    /// Swaps two layers' positions.
    pub fn swap_layers(&mut self, a: usize, b: usize) {
        if a >= self.layers.len() || b >= self.layers.len() {
            error!("swap_layers: indices {} and {} out of range", a, b);
            return;
        }
        self.layers.swap(a, b);
    }

    /// Registers an image file name at `index`, leaving gaps as `None`.
    pub fn add_image(&mut self, file_name: &str, index: usize) {
        if index >= self.images.len() {
            self.images.resize(index + 1, None);
        }
        self.images[index] = Some(file_name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_has_one_layer() {
        let map = TileMap::create(16, 4, 3);
        assert_eq!(map.layers.len(), 1);
        assert_eq!(map.layers[0].name, "New Layer");
        assert!(map.layers[0].visible);
        assert_eq!(map.pixel_width(), 64);
        assert_eq!(map.pixel_height(), 48);
    }

    #[test]
    fn set_tile_returns_previous_and_grows_layers() {
        let mut map = TileMap::create(16, 4, 3);
        assert_eq!(map.set_tile(Tile::new(1, 2, 0), 1, 1, 2), None);
        assert_eq!(map.layers.len(), 3);
        assert_eq!(
            map.set_tile(Tile::new(5, 5, 1), 1, 1, 2),
            Some(Tile::new(1, 2, 0))
        );
        assert_eq!(map.tile(1, 1, 2), Some(Tile::new(5, 5, 1)));
    }

    #[test]
    fn out_of_range_cells_are_ignored() {
        let mut map = TileMap::create(16, 4, 3);
        assert_eq!(map.set_tile(Tile::new(0, 0, 0), 4, 0, 0), None);
        assert_eq!(map.tile(4, 0, 0), None);
        assert_eq!(map.remove_tile(0, 3, 0), None);
        assert_eq!(map.tile(0, 0, 9), None);
    }

    #[test]
    fn remove_tile_returns_old() {
        let mut map = TileMap::create(16, 4, 3);
        map.set_tile(Tile::new(3, 1, 0), 2, 2, 0);
        assert_eq!(map.remove_tile(2, 2, 0), Some(Tile::new(3, 1, 0)));
        assert_eq!(map.remove_tile(2, 2, 0), None);
    }

    #[test]
    fn resize_shifts_and_clips() {
        let mut map = TileMap::create(16, 3, 3);
        map.set_tile(Tile::new(0, 0, 0), 0, 0, 0);
        map.set_tile(Tile::new(2, 2, 0), 2, 2, 0);

        map.resize(4, 4, 1, 1);
        assert_eq!((map.width, map.height), (4, 4));
        assert_eq!(map.tile(1, 1, 0), Some(Tile::new(0, 0, 0)));
        assert_eq!(map.tile(3, 3, 0), Some(Tile::new(2, 2, 0)));

        map.resize(2, 2, -1, -1);
        assert_eq!(map.tile(0, 0, 0), Some(Tile::new(0, 0, 0)));
        assert_eq!(map.layers[0].tile_count(), 1);
    }

    #[test]
    fn same_size_resize_shifts_in_place() {
        let mut map = TileMap::create(16, 3, 3);
        map.set_tile(Tile::new(0, 0, 0), 0, 0, 0);
        map.set_tile(Tile::new(2, 0, 0), 2, 0, 0);

        map.resize(3, 3, 0, 0);
        assert_eq!(map.tile(0, 0, 0), Some(Tile::new(0, 0, 0)));

        map.resize(3, 3, 1, 0);
        assert_eq!((map.width, map.height), (3, 3));
        assert_eq!(map.tile(0, 0, 0), None);
        assert_eq!(map.tile(1, 0, 0), Some(Tile::new(0, 0, 0)));
        assert_eq!(map.layers[0].tile_count(), 1);
    }

    #[test]
    fn resize_rejects_zero_size() {
        let mut map = TileMap::create(16, 3, 3);
        map.resize(0, 5, 0, 0);
        assert_eq!((map.width, map.height), (3, 3));
    }

    #[test]
    fn layer_management() {
        let mut map = TileMap::create(16, 2, 2);
        assert_eq!(map.add_layer("Top", false, None), 1);
        assert_eq!(map.add_layer("Far", true, Some(3)), 3);
        assert_eq!(map.layers.len(), 4);
        assert_eq!(map.layers[2].name, "New Layer");

        map.swap_layers(0, 1);
        assert_eq!(map.layers[0].name, "Top");
        map.swap_layers(0, 9);
        assert_eq!(map.layers[0].name, "Top");

        let removed = map.remove_layer(0).expect("layer 0 exists");
        assert_eq!(removed.name, "Top");
        assert!(map.remove_layer(10).is_none());
        map.insert_layer(removed, 0);
        assert_eq!(map.layers[0].name, "Top");
    }

    #[test]
    fn images_leave_gaps() {
        let mut map = TileMap::default();
        map.add_image("b.png", 2);
        map.add_image("a.png", 0);
        assert_eq!(
            map.images,
            vec![Some("a.png".to_string()), None, Some("b.png".to_string())]
        );
    }

    #[test]
    fn layer_tiles_iterate_row_major() {
        let mut layer = Layer::new(3, 2);
        layer.set_tile(Tile::new(0, 0, 0), 2, 0);
        layer.set_tile(Tile::new(1, 0, 0), 0, 1);
        let cells: Vec<_> = layer.tiles().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(cells, vec![(2, 0), (0, 1)]);
    }
}

//! Container for the static collision shapes of a level.

use macroquad::math::{vec2, Vec2};

use crate::shapes::Shape;

/// Default gravity, in meters per second squared.
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.8);

/// Stable handle to a shape in a [`BlazeWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// Collision shapes plus a gravity vector. Not a simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct BlazeWorld {
    /// Gravity in meters per second squared
    pub gravity: Vec2,
    shapes: Vec<(ShapeId, Shape)>,
    next_id: u32,
}

impl Default for BlazeWorld {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            shapes: Vec::new(),
            next_id: 0,
        }
    }
}

impl BlazeWorld {
    /// Empty world with default gravity.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a shape and returns its handle.
    pub fn add_shape(&mut self, shape: impl Into<Shape>) -> ShapeId {
        let id = self.alloc_id();
        self.shapes.push((id, shape.into()));
        id
    }

    /// Puts a previously removed shape back at `index` under its old id.
    pub fn insert_shape(&mut self, index: usize, id: ShapeId, shape: Shape) {
        let index = index.min(self.shapes.len());
        self.shapes.insert(index, (id, shape));
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Removes a shape, returning its position and value.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<(usize, Shape)> {
        let index = self.position(id)?;
        let (_, shape) = self.shapes.remove(index);
        Some((index, shape))
    }

    /// Position of a shape in paint order.
    pub fn position(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|(sid, _)| *sid == id)
    }

    /// Shape lookup.
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    /// Mutable shape lookup.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s)
    }

    /// All shapes in insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().map(|(id, s)| (*id, s))
    }

    /// Number of shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// True when there are no shapes.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// First shape containing `p`.
    pub fn shape_at(&self, p: Vec2) -> Option<ShapeId> {
        self.shapes
            .iter()
            .find(|(_, s)| s.contains(p))
            .map(|(id, _)| *id)
    }

    /// Follows a map resize: every shape moves by the pixel offset. Shapes
    /// left outside the new bounds are kept.
    pub fn resize(&mut self, _width: f32, _height: f32, x_offset: f32, y_offset: f32) {
        let offset = vec2(x_offset, y_offset);
        for (_, shape) in &mut self.shapes {
            shape.shift(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Polygon};

    fn triangle() -> Polygon {
        Polygon::new(vec![vec2(0.0, 0.0), vec2(8.0, 0.0), vec2(0.0, 8.0)])
    }

    #[test]
    fn default_gravity_points_down() {
        assert_eq!(BlazeWorld::new().gravity, vec2(0.0, -9.8));
    }

    #[test]
    fn remove_and_reinsert_keeps_identity_and_order() {
        let mut world = BlazeWorld::new();
        let a = world.add_shape(triangle());
        let b = world.add_shape(Circle::new(vec2(20.0, 20.0), 4.0));
        let c = world.add_shape(triangle());

        let (index, shape) = world.remove_shape(b).expect("b exists");
        assert_eq!(index, 1);
        assert!(world.shape(b).is_none());
        assert!(world.remove_shape(b).is_none());

        world.insert_shape(index, b, shape);
        let order: Vec<_> = world.shapes().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b, c]);

        let d = world.add_shape(triangle());
        assert!(d.0 > c.0);
    }

    #[test]
    fn shape_at_returns_first_hit() {
        let mut world = BlazeWorld::new();
        let circle = world.add_shape(Circle::new(vec2(2.0, 2.0), 4.0));
        world.add_shape(triangle());
        assert_eq!(world.shape_at(vec2(1.0, 1.0)), Some(circle));
        assert_eq!(world.shape_at(vec2(100.0, 100.0)), None);
    }

    #[test]
    fn resize_shifts_shapes() {
        let mut world = BlazeWorld::new();
        let id = world.add_shape(Circle::new(vec2(2.0, 2.0), 4.0));
        world.resize(64.0, 64.0, 32.0, -16.0);
        assert_eq!(world.shape(id).map(|s| s.center()), Some(vec2(34.0, -14.0)));
    }
}

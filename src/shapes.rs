//! Collision shape geometry: polygons, circles and their hit tests.

use log::warn;
use macroquad::math::{vec2, Rect, Vec2};

/// Physical properties attached to every static shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Friction coefficient
    pub friction: f32,
    /// Bounciness, 0 is none
    pub restitution: f32,
    /// Damage per second dealt on contact
    pub damage: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 1.0,
            restitution: 0.0,
            damage: 0.0,
        }
    }
}

/// A polygon outline with a cached concavity flag.
///
/// The vertex order matters: [`Polygon::contains`] expects the vertices to be
/// counter-clockwise, which [`Polygon::force_counter_clockwise`] arranges.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Vec2>,
    concave: bool,
    center: Vec2,
    /// Physical properties
    pub material: Material,
}

impl Polygon {
    /// Builds a polygon from its vertices.
    pub fn new(points: Vec<Vec2>) -> Self {
        if points.len() < 3 {
            warn!("Polygon constructed with fewer than three points");
        }
        let mut polygon = Self {
            points,
            concave: true,
            center: Vec2::ZERO,
            material: Material::default(),
        };
        polygon.refresh();
        polygon
    }

    /// A polygon holding only the trailing cursor vertex, the starting state
    /// of an interactive drawing.
    pub fn start() -> Self {
        Self {
            points: vec![Vec2::ZERO],
            concave: true,
            center: Vec2::ZERO,
            material: Material::default(),
        }
    }

    /// Same polygon with the given material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// The vertices in order.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Appends a vertex.
    pub fn add_point(&mut self, p: Vec2) {
        self.points.push(p);
        self.refresh();
    }

    /// The last vertex placed before the trailing cursor vertex, if the
    /// polygon has more than two points.
    pub fn last_point(&self) -> Option<Vec2> {
        if self.points.len() > 2 {
            Some(self.points[self.points.len() - 2])
        } else {
            None
        }
    }

    /// Drops the trailing vertex.
    pub fn pop_point(&mut self) -> Option<Vec2> {
        let p = self.points.pop();
        self.refresh();
        p
    }

    /// Sorts the vertices by angle around the center so that the polygon
    /// winds counter-clockwise.
    ///
    /// Only guaranteed for star-shaped outlines.
    pub fn force_counter_clockwise(&mut self) {
        let c = self.center;
        let angle = |p: &Vec2| (p.x - c.x).atan2(p.y - c.y);
        self.points.sort_by(|a, b| angle(b).total_cmp(&angle(a)));
        self.refresh();
    }

    /// Average of the vertices.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// True for valid convex outlines. Degenerate polygons (two points or
    /// fewer) are never convex.
    pub fn is_convex(&self) -> bool {
        self.points.len() > 2 && !self.concave
    }

    /// Cached concavity flag.
    pub fn is_concave(&self) -> bool {
        self.concave
    }

    /// Moves vertex `index` to `p`. Out-of-range indices are ignored.
    pub fn adjust(&mut self, index: usize, p: Vec2) {
        match self.points.get_mut(index) {
            Some(vertex) => *vertex = p,
            None => return,
        }
        self.refresh();
    }

    /// Moves the trailing vertex to `p`.
    pub fn adjust_last(&mut self, p: Vec2) {
        if let Some(last) = self.points.len().checked_sub(1) {
            self.adjust(last, p);
        }
    }

    /// Point-in-polygon test against the right-hand normal of every edge.
    pub fn contains(&self, p: Vec2) -> bool {
        let n = self.points.len();
        if n == 0 {
            return false;
        }
        (0..n).all(|i| {
            let start = self.points[i];
            let end = self.points[(i + 1) % n];
            let d = end - start;
            let normal = vec2(d.y, -d.x);
            (p - start).dot(normal) < 0.0
        })
    }

    /// Translates every vertex.
    pub fn shift(&mut self, offset: Vec2) {
        for p in &mut self.points {
            *p += offset;
        }
        self.refresh();
    }

    /// Drag handles: one per vertex.
    pub fn handles(&self) -> Vec<Vec2> {
        self.points.clone()
    }

    /// Axis-aligned bounds of the vertices.
    pub fn bounding_box(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::new(0.0, 0.0, 0.0, 0.0);
        };
        let (min, max) = self
            .points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    fn refresh(&mut self) {
        self.concave = compute_concave(&self.points);
        if !self.points.is_empty() {
            let sum = self.points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
            self.center = sum / self.points.len() as f32;
        }
    }
}

/// A polygon is concave when the turn at some vertex has the opposite sign
/// of the turn at another. Triangles are always convex, anything smaller is
/// degenerate and reported as concave.
fn compute_concave(points: &[Vec2]) -> bool {
    let n = points.len();
    if n <= 2 {
        return true;
    }
    if n == 3 {
        return false;
    }
    let mut negative = false;
    let mut positive = false;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let z = (b - a).perp_dot(c - b);
        if z < 0.0 {
            negative = true;
        } else if z > 0.0 {
            positive = true;
        }
        if negative && positive {
            return true;
        }
    }
    false
}

/// A circle with an optional radius snap increment.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    center: Vec2,
    radius: f32,
    snap: Option<f32>,
    /// Physical properties
    pub material: Material,
}

impl Circle {
    /// Circle without radius snapping.
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self {
            center,
            radius,
            snap: None,
            material: Material::default(),
        }
    }

    /// Circle whose radius snaps to multiples of `snap` when adjusted.
    pub fn with_snap(center: Vec2, radius: f32, snap: f32) -> Self {
        Self {
            snap: Some(snap),
            ..Self::new(center, radius)
        }
    }

    /// Same circle with the given material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Radius in pixels.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Sets the radius without snapping.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    /// Snap increment, if any.
    pub fn snap(&self) -> Option<f32> {
        self.snap
    }

    /// Sets or clears the snap increment.
    pub fn set_snap(&mut self, snap: Option<f32>) {
        self.snap = snap;
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Moves the center.
    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    /// Stretches the circle so its edge passes through `p`, snapped to the
    /// increment and never below one increment.
    pub fn adjust(&mut self, p: Vec2) {
        let distance = self.center.distance(p);
        self.radius = match self.snap {
            Some(step) if step > 0.0 => ((distance / step).round() * step).max(step),
            _ => distance,
        };
    }

    /// Strict inside test.
    pub fn contains(&self, p: Vec2) -> bool {
        self.center.distance_squared(p) < self.radius * self.radius
    }

    /// Translates the center.
    pub fn shift(&mut self, offset: Vec2) {
        self.center += offset;
    }

    /// Drag handles: left, right, top and bottom extremes.
    pub fn handles(&self) -> Vec<Vec2> {
        let (c, r) = (self.center, self.radius);
        vec![
            vec2(c.x - r, c.y),
            vec2(c.x + r, c.y),
            vec2(c.x, c.y - r),
            vec2(c.x, c.y + r),
        ]
    }

    /// Axis-aligned bounds.
    pub fn bounding_box(&self) -> Rect {
        let (c, r) = (self.center, self.radius);
        Rect::new(c.x - r, c.y - r, r * 2.0, r * 2.0)
    }
}

/// A static collision shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Convex polygon
    Polygon(Polygon),
    /// Circle
    Circle(Circle),
}

impl Shape {
    /// Type tag used in level files.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Polygon(_) => "polygon",
            Shape::Circle(_) => "circle",
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        match self {
            Shape::Polygon(p) => p.center(),
            Shape::Circle(c) => c.center(),
        }
    }

    /// Physical properties.
    pub fn material(&self) -> &Material {
        match self {
            Shape::Polygon(p) => &p.material,
            Shape::Circle(c) => &c.material,
        }
    }

    /// Mutable physical properties.
    pub fn material_mut(&mut self) -> &mut Material {
        match self {
            Shape::Polygon(p) => &mut p.material,
            Shape::Circle(c) => &mut c.material,
        }
    }

    /// Hit test.
    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            Shape::Polygon(poly) => poly.contains(p),
            Shape::Circle(c) => c.contains(p),
        }
    }

    /// Translates the shape.
    pub fn shift(&mut self, offset: Vec2) {
        match self {
            Shape::Polygon(p) => p.shift(offset),
            Shape::Circle(c) => c.shift(offset),
        }
    }

    /// Drags handle `handle` to `p`. Circles have a single degree of freedom
    /// and ignore the index.
    pub fn adjust(&mut self, handle: usize, p: Vec2) {
        match self {
            Shape::Polygon(poly) => poly.adjust(handle, p),
            Shape::Circle(c) => c.adjust(p),
        }
    }

    /// Drag handles.
    pub fn handles(&self) -> Vec<Vec2> {
        match self {
            Shape::Polygon(p) => p.handles(),
            Shape::Circle(c) => c.handles(),
        }
    }

    /// Axis-aligned bounds.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Polygon(p) => p.bounding_box(),
            Shape::Circle(c) => c.bounding_box(),
        }
    }
}

impl From<Polygon> for Shape {
    fn from(p: Polygon) -> Self {
        Shape::Polygon(p)
    }
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

/// True if `p` lies in the square handle of half-size `size` centered on
/// `handle`.
pub fn point_in_handle(p: Vec2, handle: Vec2, size: f32) -> bool {
    p.x >= handle.x - size
        && p.x <= handle.x + size
        && p.y >= handle.y - size
        && p.y <= handle.y + size
}

/// True if the shape's bounding box touches `rect`.
pub fn intersects_rect(shape: &Shape, rect: Rect) -> bool {
    let b = shape.bounding_box();
    !(b.x + b.w < rect.x || b.y + b.h < rect.y || b.x > rect.x + rect.w || b.y > rect.y + rect.h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn square() -> Polygon {
        Polygon::new(vec![
            vec2(0.0, 0.0),
            vec2(2.0, 0.0),
            vec2(2.0, 2.0),
            vec2(0.0, 2.0),
        ])
    }

    #[test]
    fn triangles_are_always_convex() {
        let tri = Polygon::new(vec![vec2(1.0, 1.0), vec2(4.0, 2.0), vec2(2.0, 4.0)]);
        assert!(tri.is_convex());
        let flipped = Polygon::new(vec![vec2(1.0, 1.0), vec2(2.0, 4.0), vec2(4.0, 2.0)]);
        assert!(flipped.is_convex());
    }

    #[test]
    fn degenerate_polygons_are_never_convex() {
        assert!(!Polygon::new(vec![]).is_convex());
        assert!(!Polygon::new(vec![vec2(0.0, 0.0), vec2(1.0, 0.0)]).is_convex());
        assert!(Polygon::start().is_concave());
    }

    #[test]
    fn detects_concave_outline() {
        let arrow = Polygon::new(vec![
            vec2(0.0, 0.0),
            vec2(4.0, 0.0),
            vec2(1.0, 1.0),
            vec2(0.0, 4.0),
        ]);
        assert!(arrow.is_concave());
        assert!(!arrow.is_convex());
        assert!(square().is_convex());
    }

    #[test]
    fn convexity_follows_mutations() {
        let mut poly = square();
        poly.adjust(2, vec2(0.5, 0.5));
        assert!(poly.is_concave());
        poly.adjust(2, vec2(2.0, 2.0));
        assert!(poly.is_convex());
        poly.pop_point();
        poly.pop_point();
        assert!(!poly.is_convex());
    }

    #[test]
    fn triangle_hit_test() {
        let tri = Polygon::new(vec![vec2(1.0, 1.0), vec2(4.0, 2.0), vec2(2.0, 4.0)]);
        assert!(tri.contains(vec2(2.0, 2.0)));
        assert!(!tri.contains(vec2(2.0, 1.0)));
    }

    #[test]
    fn regular_polygon_contains_inner_points_only() {
        let hexagon = Polygon::new(
            (0..6)
                .map(|k| {
                    let a = TAU * k as f32 / 6.0;
                    vec2(10.0 + 5.0 * a.cos(), 10.0 + 5.0 * a.sin())
                })
                .collect(),
        );
        assert!(hexagon.is_convex());
        assert!(hexagon.contains(vec2(10.0, 10.0)));
        assert!(hexagon.contains(vec2(12.0, 11.0)));
        assert!(!hexagon.contains(vec2(100.0, -40.0)));
        assert!(!hexagon.contains(vec2(10.0, 16.0)));
    }

    #[test]
    fn edge_points_are_outside() {
        assert!(!square().contains(vec2(1.0, 0.0)));
    }

    #[test]
    fn force_counter_clockwise_untangles_bowtie_order() {
        let mut poly = Polygon::new(vec![
            vec2(0.0, 0.0),
            vec2(2.0, 2.0),
            vec2(2.0, 0.0),
            vec2(0.0, 2.0),
        ]);
        assert!(poly.is_concave());
        poly.force_counter_clockwise();
        assert_eq!(
            poly.points(),
            &[vec2(2.0, 0.0), vec2(2.0, 2.0), vec2(0.0, 2.0), vec2(0.0, 0.0)]
        );
        assert!(poly.is_convex());
        assert!(poly.contains(vec2(1.0, 1.0)));
    }

    #[test]
    fn clockwise_polygon_rejects_everything_until_reordered() {
        let mut cw = Polygon::new(vec![
            vec2(0.0, 0.0),
            vec2(0.0, 2.0),
            vec2(2.0, 2.0),
            vec2(2.0, 0.0),
        ]);
        assert!(!cw.contains(vec2(1.0, 1.0)));
        cw.force_counter_clockwise();
        assert!(cw.contains(vec2(1.0, 1.0)));
    }

    #[test]
    fn center_is_vertex_average_and_follows_shift() {
        let mut poly = square();
        assert_eq!(poly.center(), vec2(1.0, 1.0));
        poly.shift(vec2(3.0, -1.0));
        assert_eq!(poly.center(), vec2(4.0, 0.0));
        assert_eq!(poly.points()[0], vec2(3.0, -1.0));
    }

    #[test]
    fn last_point_skips_cursor_vertex() {
        let mut poly = Polygon::start();
        assert_eq!(poly.last_point(), None);
        poly.add_point(vec2(4.0, 4.0));
        assert_eq!(poly.last_point(), None);
        poly.add_point(vec2(8.0, 4.0));
        assert_eq!(poly.last_point(), Some(vec2(4.0, 4.0)));
    }

    #[test]
    fn polygon_bounding_box() {
        let b = square().bounding_box();
        assert_eq!((b.x, b.y, b.w, b.h), (0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn circle_radius_snaps_to_increment() {
        let mut c = Circle::with_snap(vec2(0.0, 0.0), 16.0, 16.0);
        c.adjust(vec2(37.0, 0.0));
        assert_eq!(c.radius(), 32.0);
        c.adjust(vec2(2.0, 0.0));
        assert_eq!(c.radius(), 16.0);

        let mut free = Circle::new(vec2(0.0, 0.0), 1.0);
        free.adjust(vec2(3.0, 4.0));
        assert_eq!(free.radius(), 5.0);
    }

    #[test]
    fn circle_hit_test_is_strict() {
        let c = Circle::new(vec2(10.0, 10.0), 5.0);
        assert!(c.contains(vec2(12.0, 12.0)));
        assert!(!c.contains(vec2(15.0, 10.0)));
        assert!(!c.contains(vec2(30.0, 30.0)));
    }

    #[test]
    fn circle_handles_sit_on_axes() {
        let c = Circle::new(vec2(10.0, 10.0), 5.0);
        assert_eq!(
            c.handles(),
            vec![vec2(5.0, 10.0), vec2(15.0, 10.0), vec2(10.0, 5.0), vec2(10.0, 15.0)]
        );
        let b = c.bounding_box();
        assert_eq!((b.x, b.y, b.w, b.h), (5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn shape_dispatch() {
        let mut shape = Shape::from(Circle::with_snap(vec2(0.0, 0.0), 8.0, 8.0));
        assert_eq!(shape.kind(), "circle");
        shape.adjust(3, vec2(17.0, 0.0));
        match &shape {
            Shape::Circle(c) => assert_eq!(c.radius(), 16.0),
            other => panic!("expected circle, got {:?}", other),
        }
        shape.material_mut().damage = 2.5;
        assert_eq!(shape.material().damage, 2.5);
        assert_eq!(shape.material().friction, 1.0);
    }

    #[test]
    fn handle_and_rect_tests() {
        assert!(point_in_handle(vec2(12.0, 0.0), vec2(0.0, 0.0), 12.0));
        assert!(!point_in_handle(vec2(12.5, 0.0), vec2(0.0, 0.0), 12.0));

        let shape = Shape::from(Circle::new(vec2(10.0, 10.0), 5.0));
        assert!(intersects_rect(&shape, Rect::new(0.0, 0.0, 6.0, 6.0)));
        assert!(!intersects_rect(&shape, Rect::new(20.0, 20.0, 5.0, 5.0)));
    }
}

//! Debug drawing buffers
//!
//! Based on Game Engine Architecture 3rd Edition, Section 10.2:
//! "Debug drawing facilities allow programmers to render simple shapes like
//! lines, points, spheres and boxes for debugging and visualization purposes."
//!
//! Everything is reduced to three primitive lists (lines, triangles, points).
//! Each primitive carries a remaining life in seconds; [`DebugDraw::update`]
//! drops primitives whose life went negative, so a life of 0 survives exactly
//! one tick.

use crate::foundation::math::constants::PI;
use crate::foundation::math::Vec3;
use crate::spatial::Frustum;

/// Segments used for sphere rings
const SPHERE_COLUMNS: i32 = 36;
/// Segments used for cylinders, capsules and cones
const ROUND_SEGMENTS: usize = 32;
/// Segments used for circles
const CIRCLE_SEGMENTS: usize = 64;

/// Convert an ARGB colour to the ABGR layout stored in the buffers
pub const fn argb_to_abgr(color: u32) -> u32 {
    (color & 0xff00_ff00) | ((color & 0xff) << 16) | ((color >> 16) & 0xff)
}

/// Line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Start point
    pub from: Vec3,
    /// End point
    pub to: Vec3,
    /// ABGR colour
    pub color: u32,
    /// Seconds left
    pub life: f32,
}

/// Filled triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugTriangle {
    /// First corner
    pub p0: Vec3,
    /// Second corner
    pub p1: Vec3,
    /// Third corner
    pub p2: Vec3,
    /// ABGR colour
    pub color: u32,
    /// Seconds left
    pub life: f32,
}

/// Single point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugPoint {
    /// Position
    pub pos: Vec3,
    /// ABGR colour
    pub color: u32,
    /// Seconds left
    pub life: f32,
}

trait Expiring {
    fn life_mut(&mut self) -> &mut f32;
}

impl Expiring for DebugLine {
    fn life_mut(&mut self) -> &mut f32 {
        &mut self.life
    }
}

impl Expiring for DebugTriangle {
    fn life_mut(&mut self) -> &mut f32 {
        &mut self.life
    }
}

impl Expiring for DebugPoint {
    fn life_mut(&mut self) -> &mut f32 {
        &mut self.life
    }
}

/// Age a primitive list; expired entries are swap-removed so order changes
fn age<T: Expiring>(items: &mut Vec<T>, dt: f32) {
    for i in (0..items.len()).rev() {
        let life = items[i].life_mut();
        if *life < 0.0 {
            items.swap_remove(i);
        } else {
            *life -= dt;
        }
    }
}

/// Two unit vectors perpendicular to `up` and to each other
fn circle_basis(up: Vec3) -> (Vec3, Vec3) {
    let z = Vec3::new(-up.y, up.x, 0.0);
    let x = up.cross(&z);
    (
        x.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x),
        z.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z),
    )
}

/// Transient debug geometry submitted by gameplay and tools
#[derive(Debug, Clone, Default)]
pub struct DebugDraw {
    lines: Vec<DebugLine>,
    triangles: Vec<DebugTriangle>,
    points: Vec<DebugPoint>,
}

impl DebugDraw {
    /// Empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to render this frame
    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    /// Triangles to render this frame
    pub fn triangles(&self) -> &[DebugTriangle] {
        &self.triangles
    }

    /// Points to render this frame
    pub fn points(&self) -> &[DebugPoint] {
        &self.points
    }

    /// Total number of primitives
    pub fn len(&self) -> usize {
        self.lines.len() + self.triangles.len() + self.points.len()
    }

    /// Whether no primitive is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every primitive
    pub fn clear(&mut self) {
        self.lines.clear();
        self.triangles.clear();
        self.points.clear();
    }

    /// Remove primitives whose life went negative and age the others
    pub fn update(&mut self, dt: f32) {
        age(&mut self.triangles, dt);
        age(&mut self.lines, dt);
        age(&mut self.points, dt);
    }

    /// Line segment; `color` is ARGB
    pub fn line(&mut self, from: Vec3, to: Vec3, color: u32, life: f32) {
        self.lines.push(DebugLine {
            from,
            to,
            color: argb_to_abgr(color),
            life,
        });
    }

    /// Filled triangle; `color` is ARGB
    pub fn triangle(&mut self, p0: Vec3, p1: Vec3, p2: Vec3, color: u32, life: f32) {
        self.triangles.push(DebugTriangle {
            p0,
            p1,
            p2,
            color: argb_to_abgr(color),
            life,
        });
    }

    /// Point; `color` is ARGB
    pub fn point(&mut self, pos: Vec3, color: u32, life: f32) {
        self.points.push(DebugPoint {
            pos,
            color: argb_to_abgr(color),
            life,
        });
    }

    /// Wireframe axis-aligned box
    pub fn cube(&mut self, min: Vec3, max: Vec3, color: u32, life: f32) {
        let corner = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        for y in [min.y, max.y] {
            let ring = [
                corner(min.x, y, min.z),
                corner(max.x, y, min.z),
                corner(max.x, y, max.z),
                corner(min.x, y, max.z),
            ];
            for i in 0..4 {
                self.line(ring[i], ring[(i + 1) % 4], color, life);
            }
        }
        for (x, z) in [(min.x, min.z), (max.x, min.z), (max.x, max.z), (min.x, max.z)] {
            self.line(corner(x, min.y, z), corner(x, max.y, z), color, life);
        }
    }

    /// Wireframe oriented box from its centre and three half-axes
    pub fn oriented_cube(&mut self, pos: Vec3, dir: Vec3, up: Vec3, right: Vec3, color: u32, life: f32) {
        for (a, b) in [(dir, up), (-dir, up), (dir, -up), (-dir, -up)] {
            self.line(pos + a + b + right, pos + a + b - right, color, life);
        }
        for (a, b) in [(up, right), (up, -right), (-up, right), (-up, -right)] {
            self.line(pos + dir + a + b, pos - dir + a + b, color, life);
        }
        for (a, b) in [(dir, right), (dir, -right), (-dir, right), (-dir, -right)] {
            self.line(pos + a + up + b, pos + a - up + b, color, life);
        }
    }

    /// Solid axis-aligned box, two triangles per face
    pub fn solid_cube(&mut self, min: Vec3, max: Vec3, color: u32, life: f32) {
        let v = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let faces = [
            [v(false, false, false), v(false, true, false), v(true, true, false), v(true, false, false)],
            [v(false, false, true), v(true, false, true), v(true, true, true), v(false, true, true)],
            [v(false, false, false), v(true, false, false), v(true, false, true), v(false, false, true)],
            [v(false, true, false), v(false, true, true), v(true, true, true), v(true, true, false)],
            [v(false, false, false), v(false, false, true), v(false, true, true), v(false, true, false)],
            [v(true, false, false), v(true, true, false), v(true, true, true), v(true, false, true)],
        ];
        for [a, b, c, d] in faces {
            self.triangle(a, b, c, color, life);
            self.triangle(a, c, d, color, life);
        }
    }

    /// Latitude rows `from..to` of a sphere made of line rings
    fn sphere_rows(&mut self, center: Vec3, radius: f32, rows: std::ops::Range<i32>, color: u32, life: f32) {
        let step = 2.0 * PI / SPHERE_COLUMNS as f32;
        let half = SPHERE_COLUMNS / 2;
        let at = |ci: f32, si: f32, cy: f32, sy: f32| center + Vec3::new(ci * cy, sy, si * cy) * radius;
        for y in rows {
            let (sy, cy) = (y as f32 * step).sin_cos();
            let (sy1, cy1) = ((y + 1) as f32 * step).sin_cos();
            let (mut prev_si, mut prev_ci) = ((-half - 1) as f32 * step).sin_cos();
            for i in -half..half {
                let (si, ci) = (i as f32 * step).sin_cos();
                self.line(at(ci, si, cy, sy), at(ci, si, cy1, sy1), color, life);
                self.line(at(ci, si, cy, sy), at(prev_ci, prev_si, cy, sy), color, life);
                self.line(at(prev_ci, prev_si, cy1, sy1), at(ci, si, cy1, sy1), color, life);
                prev_ci = ci;
                prev_si = si;
            }
        }
    }

    /// Wireframe sphere
    pub fn sphere(&mut self, center: Vec3, radius: f32, color: u32, life: f32) {
        let rows = SPHERE_COLUMNS / 2;
        self.sphere_rows(center, radius, -(rows / 2)..rows / 2, color, life);
    }

    /// Upper (`top`) or lower half of a wireframe sphere
    pub fn half_sphere(&mut self, center: Vec3, radius: f32, top: bool, color: u32, life: f32) {
        let rows = SPHERE_COLUMNS / 2;
        let range = if top { 0..rows / 2 } else { -(rows / 2)..0 };
        self.sphere_rows(center, radius, range, color, life);
    }

    /// Upright capsule standing on `position`; `height` excludes the caps
    pub fn capsule(&mut self, position: Vec3, height: f32, radius: f32, color: u32, life: f32) {
        let bottom = position + Vec3::new(0.0, radius, 0.0);
        let top = bottom + Vec3::new(0.0, height, 0.0);
        self.half_sphere(bottom, radius, false, color, life);
        self.half_sphere(top, radius, true, color, life);
        for i in 1..=ROUND_SEGMENTS {
            let (z, x) = (i as f32 / ROUND_SEGMENTS as f32 * 2.0 * PI).sin_cos();
            let offset = Vec3::new(x, 0.0, z) * radius;
            self.line(bottom + offset, top + offset, color, life);
        }
    }

    /// Wireframe cylinder from `position` to `position + up`
    pub fn cylinder(&mut self, position: Vec3, up: Vec3, radius: f32, color: u32, life: f32) {
        let (x_axis, z_axis) = circle_basis(up);
        let top = position + up;
        let mut prev = x_axis * radius;
        for i in 1..=ROUND_SEGMENTS {
            let (s, c) = (i as f32 / ROUND_SEGMENTS as f32 * 2.0 * PI).sin_cos();
            let offset = (x_axis * c + z_axis * s) * radius;
            self.line(position + offset, position + prev, color, life);
            self.line(top + offset, top + prev, color, life);
            self.line(position + offset, top + offset, color, life);
            prev = offset;
        }
    }

    /// Wireframe cone with its apex at `vertex` and an elliptic base at `vertex + dir`
    pub fn cone(&mut self, vertex: Vec3, dir: Vec3, axis0: Vec3, axis1: Vec3, color: u32, life: f32) {
        let base_center = vertex + dir;
        let mut prev = base_center + axis0;
        for i in 1..=ROUND_SEGMENTS {
            let (s, c) = (i as f32 / ROUND_SEGMENTS as f32 * 2.0 * PI).sin_cos();
            let p = base_center + axis0 * c + axis1 * s;
            self.line(p, prev, color, life);
            self.line(vertex, p, color, life);
            prev = p;
        }
    }

    /// Circle around `center` in the plane perpendicular to `up`
    pub fn circle(&mut self, center: Vec3, up: Vec3, radius: f32, color: u32, life: f32) {
        let (x_axis, z_axis) = circle_basis(up);
        let mut prev = x_axis * radius;
        for i in 1..=CIRCLE_SEGMENTS {
            let (s, c) = (i as f32 / CIRCLE_SEGMENTS as f32 * 2.0 * PI).sin_cos();
            let offset = (x_axis * c + z_axis * s) * radius;
            self.line(center + offset, center + prev, color, life);
            prev = offset;
        }
    }

    /// Three axis-aligned segments crossing at `center`
    pub fn cross(&mut self, center: Vec3, size: f32, color: u32, life: f32) {
        for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
            self.line(center, center - axis * size, color, life);
            self.line(center, center + axis * size, color, life);
        }
    }

    /// Edges of a frustum
    pub fn frustum(&mut self, frustum: &Frustum, color: u32, life: f32) {
        let p = &frustum.points;
        for i in 0..4 {
            self.line(p[i], p[(i + 1) % 4], color, life);
            self.line(p[4 + i], p[4 + (i + 1) % 4], color, life);
            self.line(p[i], p[4 + i], color, life);
        }
    }
}

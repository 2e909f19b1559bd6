use serde::{Deserialize, Serialize};

/// Integer pixel rectangle covering `[x_min, x_max) x [y_min, y_max)`.
///
/// Used for page space (relative to a rasterized page), tile bounds and window
/// regions alike; the meaning comes from where the rectangle is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl PixelRect {
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub const fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub const fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    pub const fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }

    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    /// Same rectangle with corners swapped where needed so that min <= max.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.x_min.min(self.x_max),
            self.y_min.min(self.y_max),
            self.x_min.max(self.x_max),
            self.y_min.max(self.y_max),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x_min + dx,
            self.y_min + dy,
            self.x_max + dx,
            self.y_max + dy,
        )
    }

    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let rect = PixelRect::new(
            self.x_min.max(other.x_min),
            self.y_min.max(other.y_min),
            self.x_max.min(other.x_max),
            self.y_max.min(other.y_max),
        );
        (!rect.is_empty()).then_some(rect)
    }
}

/// Rectangle in PDF user space (points, y pointing up) or in fractional device
/// space, depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UserRect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl UserRect {
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        (self.x_max - self.x_min).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y_max - self.y_min).abs()
    }

    pub fn normalized(&self) -> Self {
        Self::new(
            self.x_min.min(self.x_max),
            self.y_min.min(self.y_max),
            self.x_min.max(self.x_max),
            self.y_min.max(self.y_max),
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let rect = self.normalized();
        x >= rect.x_min && x <= rect.x_max && y >= rect.y_min && y <= rect.y_max
    }

    pub fn union(&self, other: &UserRect) -> Self {
        Self::new(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
        )
    }

    /// Smallest pixel rectangle enclosing this one.
    pub fn enclosing_pixels(&self) -> PixelRect {
        PixelRect::new(
            self.x_min.floor() as i32,
            self.y_min.floor() as i32,
            self.x_max.ceil() as i32,
            self.y_max.ceil() as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Affine transform `[a, b, c, d, e, f]` mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    pub fn invert(&self) -> Option<Matrix> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix([
            d * inv,
            -b * inv,
            -c * inv,
            a * inv,
            (c * f - d * e) * inv,
            (b * e - a * f) * inv,
        ]))
    }

    /// Moves the output origin by `(-dx, -dy)`.
    pub fn shifted(&self, dx: f64, dy: f64) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        Matrix([a, b, c, d, e - dx, f - dy])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

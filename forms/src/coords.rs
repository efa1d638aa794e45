//! Page-space / screen-space coordinate conversions.
//!
//! Page space is the PDF page in points, independent of zoom and rotation.
//! Screen space is the rendered page in pixels: rotated by a multiple of 90°,
//! scaled by the zoom factor, then translated to the page's on-screen origin.
//! Every function here is pure.

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

/// A point in either page or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether `pt` lies inside this rectangle, edges included.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }
}

/// Page rotation, restricted to quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map a rotation in degrees to a quarter turn. Negative and >360 values
    /// are normalized; anything that is not a multiple of 90 is rejected.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    #[must_use]
    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// True for the quarter turns that swap the page's axes.
    #[must_use]
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees).ok_or_else(|| format!("rotation must be a multiple of 90, got {degrees}"))
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Unrotated page size in points plus the rotation it is displayed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PageDimensions {
    #[must_use]
    pub fn new(width: f64, height: f64, rotation: Rotation) -> Self {
        Self { width, height, rotation }
    }

    /// US Letter, unrotated.
    #[must_use]
    pub fn letter() -> Self {
        Self::new(612.0, 792.0, Rotation::Deg0)
    }
}

/// How one page is currently displayed: its dimensions and rotation, the zoom
/// factor, and where its origin sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub page: PageDimensions,
    pub scale: f64,
    pub offset: Point,
}

impl Viewport {
    /// Unzoomed, unshifted view of `page`.
    #[must_use]
    pub fn new(page: PageDimensions) -> Self {
        Self { page, scale: 1.0, offset: Point::default() }
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn to_screen(&self, point: Point) -> Point {
        to_screen(point, &self.page, self.scale, self.offset)
    }

    #[must_use]
    pub fn to_page(&self, point: Point) -> Point {
        to_page(point, &self.page, self.scale, self.offset)
    }

    #[must_use]
    pub fn bounds_to_screen(&self, rect: Rect) -> Rect {
        bounds_to_screen(rect, &self.page, self.scale, self.offset)
    }

    /// Convert a screen-space distance (pixels) to page points.
    #[must_use]
    pub fn screen_dist_to_page(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }
}

/// Convert a page-space point to screen pixels.
///
/// Rotation is applied first, then `scale`, then `offset`.
#[must_use]
pub fn to_screen(point: Point, page: &PageDimensions, scale: f64, offset: Point) -> Point {
    let rotated = match page.rotation {
        Rotation::Deg0 => point,
        Rotation::Deg90 => Point::new(point.y, page.height - point.x),
        Rotation::Deg180 => Point::new(page.width - point.x, page.height - point.y),
        Rotation::Deg270 => Point::new(page.width - point.y, point.x),
    };
    Point::new(rotated.x * scale + offset.x, rotated.y * scale + offset.y)
}

/// Convert a screen-space point back to page space. Inverse of [`to_screen`].
#[must_use]
pub fn to_page(point: Point, page: &PageDimensions, scale: f64, offset: Point) -> Point {
    let x = (point.x - offset.x) / scale;
    let y = (point.y - offset.y) / scale;
    match page.rotation {
        Rotation::Deg0 => Point::new(x, y),
        Rotation::Deg90 => Point::new(page.height - y, x),
        Rotation::Deg180 => Point::new(page.width - x, page.height - y),
        Rotation::Deg270 => Point::new(y, page.width - x),
    }
}

/// Map a page-space rectangle to screen space.
///
/// Only the origin corner goes through the rotation; width and height are
/// scaled but never swapped. Use [`bounds_to_screen`] for the true on-screen
/// bounding box of a rotated page.
#[must_use]
pub fn rect_to_screen(rect: Rect, page: &PageDimensions, scale: f64, offset: Point) -> Rect {
    let origin = to_screen(rect.origin(), page, scale, offset);
    Rect::new(origin.x, origin.y, rect.width * scale, rect.height * scale)
}

/// Map a screen-space rectangle to page space. Same origin-only rotation rule
/// as [`rect_to_screen`].
#[must_use]
pub fn rect_to_page(rect: Rect, page: &PageDimensions, scale: f64, offset: Point) -> Rect {
    let origin = to_page(rect.origin(), page, scale, offset);
    Rect::new(origin.x, origin.y, rect.width / scale, rect.height / scale)
}

/// Screen-space bounding box of a page-space rectangle: both corners are
/// transformed and the result is normalized, so extents swap at 90°/270°.
#[must_use]
pub fn bounds_to_screen(rect: Rect, page: &PageDimensions, scale: f64, offset: Point) -> Rect {
    let a = to_screen(rect.origin(), page, scale, offset);
    let b = to_screen(Point::new(rect.x + rect.width, rect.y + rect.height), page, scale, offset);
    normalized(a, b)
}

/// Page-space bounding box of a screen-space rectangle. Inverse of
/// [`bounds_to_screen`].
#[must_use]
pub fn bounds_to_page(rect: Rect, page: &PageDimensions, scale: f64, offset: Point) -> Rect {
    let a = to_page(rect.origin(), page, scale, offset);
    let b = to_page(Point::new(rect.x + rect.width, rect.y + rect.height), page, scale, offset);
    normalized(a, b)
}

fn normalized(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
}

/// True if `point` lies on the unrotated page, edges included.
#[must_use]
pub fn is_within_page(point: Point, page: &PageDimensions) -> bool {
    point.x >= 0.0 && point.y >= 0.0 && point.x <= page.width && point.y <= page.height
}

/// Pull a rectangle back onto the page.
///
/// The origin is clamped so the far edge stays on the page, then the size is
/// clamped to what fits from that origin. The result is never larger than the
/// input.
#[must_use]
pub fn constrain_to_page(rect: Rect, page: &PageDimensions) -> Rect {
    let x = rect.x.min(page.width - rect.width).max(0.0);
    let y = rect.y.min(page.height - rect.height).max(0.0);
    Rect::new(x, y, rect.width.min(page.width - x), rect.height.min(page.height - y))
}

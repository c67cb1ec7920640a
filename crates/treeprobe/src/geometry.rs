//! Point and rectangle math shared by the locator and scroll convergence.
//!
//! Rectangles are in physical screen pixels as reported by the tree provider.
//! Points handed to input collaborators go through [`ScreenScale`] (logical
//! pixels) and optionally [`to_virtual_screen`] (absolute 0..=65535 space).

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical DPI that corresponds to a scale factor of 1.0
pub const DEFAULT_DPI: u32 = 96;

/// Extent of the normalised virtual-screen coordinate space
pub const VIRTUAL_SCREEN_EXTENT: f64 = 65535.0;

/// A point in 2D screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Screen edge of a rectangle, used by the alignment predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Bottom edge
    Bottom,
    /// Top edge
    Top,
    /// Right edge
    Right,
    /// Left edge
    Left,
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left position
    pub x: f64,
    /// Top position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// The empty rectangle
    pub const EMPTY: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge
    #[must_use]
    pub const fn left(&self) -> f64 {
        self.x
    }

    /// Top edge
    #[must_use]
    pub const fn top(&self) -> f64 {
        self.y
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// A rectangle without area carries no location
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside this rectangle (edges inclusive)
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Check if two rectangles share any area
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Translate by `(dx, dy)`
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// True if `point` lies beyond `edge`.
    ///
    /// `inset` pulls the bottom and right edges inwards to account for a
    /// scrollbar drawn inside the rectangle; it is ignored for top and left.
    #[must_use]
    pub fn is_beyond(&self, point: &Point, edge: Edge, inset: f64) -> bool {
        match edge {
            Edge::Bottom => point.y > self.bottom() - inset,
            Edge::Top => point.y < self.top(),
            Edge::Right => point.x > self.right() - inset,
            Edge::Left => point.x < self.left(),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Reason carried by rejected scale factors and virtual screens
pub const INVALID_SCALE: &str = "INVALID SCALE";

/// Ratio between physical and logical pixels per axis.
///
/// Both factors are finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScaleFactors")]
pub struct ScreenScale {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct ScaleFactors {
    x: f64,
    y: f64,
}

impl TryFrom<ScaleFactors> for ScreenScale {
    type Error = ProbeError;

    fn try_from(factors: ScaleFactors) -> ProbeResult<Self> {
        Self::new(factors.x, factors.y)
    }
}

impl Default for ScreenScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ScreenScale {
    /// No scaling
    pub const IDENTITY: Self = Self { x: 1.0, y: 1.0 };

    /// Create from explicit factors; both must be finite and positive
    pub fn new(x: f64, y: f64) -> ProbeResult<Self> {
        if !(x.is_finite() && x > 0.0 && y.is_finite() && y > 0.0) {
            return Err(ProbeError::InvalidArgument {
                reason: INVALID_SCALE.to_string(),
                message: format!("screen scale {x} x {y} must be positive"),
            });
        }
        Ok(Self { x, y })
    }

    /// Derive the factors from the display DPI; zero is rejected
    pub fn from_dpi(x_dpi: u32, y_dpi: u32) -> ProbeResult<Self> {
        Self::new(
            f64::from(x_dpi) / f64::from(DEFAULT_DPI),
            f64::from(y_dpi) / f64::from(DEFAULT_DPI),
        )
    }

    /// Horizontal factor
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical factor
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Center of `rect` in logical pixels.
    ///
    /// Each component is truncated to a whole pixel before the half-size
    /// offset is added, so the result is always integral.
    #[must_use]
    pub fn scaled_center(&self, rect: &Rect) -> Point {
        let x = (rect.x / self.x).trunc() + (rect.width / self.x * 0.5).trunc();
        let y = (rect.y / self.y).trunc() + (rect.height / self.y * 0.5).trunc();
        Point::new(x, y)
    }
}

/// Map a screen point into the normalised virtual-screen space.
///
/// `virtual_screen` is the bounding rectangle of all monitors and must not
/// be empty.
pub fn to_virtual_screen(point: &Point, virtual_screen: &Rect) -> ProbeResult<Point> {
    if virtual_screen.is_empty() {
        return Err(ProbeError::InvalidArgument {
            reason: INVALID_SCALE.to_string(),
            message: format!("virtual screen {virtual_screen} is empty"),
        });
    }
    let sx = point.x - virtual_screen.left();
    let sy = point.y - virtual_screen.top();
    Ok(Point::new(
        sx * (VIRTUAL_SCREEN_EXTENT / virtual_screen.width),
        sy * (VIRTUAL_SCREEN_EXTENT / virtual_screen.height),
    ))
}

//! World geometry: bounds, the viewport band, and where the tower, hole and tray sit.
//!
//! World units, y grows upwards. The terminal host maps them to cells.

pub use glam::Vec2;

/// Axis-aligned bounds; containment is inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_extents(center: Vec2, extents: Vec2) -> Self {
        Self::new(center - extents, center + extents)
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// Vertical band a placed block must stay inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalBounds {
    pub bottom: f32,
    pub top: f32,
}

impl VerticalBounds {
    pub fn new(bottom: f32, top: f32) -> Self {
        Self {
            bottom: bottom.min(top),
            top: bottom.max(top),
        }
    }

    #[inline]
    pub fn contains(&self, y: f32) -> bool {
        y >= self.bottom && y <= self.top
    }

    /// True if the whole span `[lo, hi]` lies in the band.
    pub fn contains_span(&self, lo: f32, hi: f32) -> bool {
        self.contains(lo) && self.contains(hi)
    }
}

/// Read-only queries the core makes about the static scene.
pub trait Geometry {
    fn viewport(&self) -> VerticalBounds;
    fn tower_area(&self) -> Bounds;
    fn hole_area(&self) -> Bounds;
}

/// Scene arrangement for a world of a given size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Everything the host can show.
    pub world: Bounds,
    pub viewport: VerticalBounds,
    pub tower_area: Bounds,
    pub hole_area: Bounds,
    /// Where disposed blocks fly to.
    pub hole_target: Vec2,
    /// Band along the bottom that holds the tray.
    pub tray_band: Bounds,
    /// World position of tray slot 0 before scrolling.
    pub tray_origin: Vec2,
}

/// Height of the tray band in world units.
pub const TRAY_BAND_HEIGHT: f32 = 3.0;
/// Strip above the viewport top that still belongs to the tower area.
pub const SKY_HEIGHT: f32 = 2.0;

impl Layout {
    /// Default arrangement: tray along the bottom, tower on the left two thirds,
    /// hole on the right. The tower area reaches into a sky strip above the
    /// viewport so drops up there are caught as "too high".
    pub fn for_world(width: f32, height: f32) -> Self {
        let world = Bounds::new(Vec2::ZERO, Vec2::new(width, height));
        let floor = TRAY_BAND_HEIGHT;
        let viewport = VerticalBounds::new(floor, (height - SKY_HEIGHT).max(floor));
        let tower_area = Bounds::new(Vec2::new(1.0, floor), Vec2::new(width * 0.62, height));
        let hole_w = (width * 0.22).max(3.0);
        let hole_area = Bounds::new(
            Vec2::new(width - hole_w - 1.0, floor),
            Vec2::new(width - 1.0, floor + (height - floor) * 0.35),
        );
        let hole_target = Vec2::new(hole_area.center().x, hole_area.min.y);
        let tray_band = Bounds::new(Vec2::ZERO, Vec2::new(width, floor));
        let tray_origin = Vec2::new(2.0, 0.5);
        Self {
            world,
            viewport,
            tower_area,
            hole_area,
            hole_target,
            tray_band,
            tray_origin,
        }
    }

    /// Horizontal extent the tray may show blocks in.
    pub fn visible_x(&self) -> (f32, f32) {
        (self.world.min.x, self.world.max.x)
    }
}

impl Geometry for Layout {
    fn viewport(&self) -> VerticalBounds {
        self.viewport
    }

    fn tower_area(&self) -> Bounds {
        self.tower_area
    }

    fn hole_area(&self) -> Bounds {
        self.hole_area
    }
}

//! Where a released block landed.

use crate::geometry::{Geometry, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Tower,
    Hole,
    Neither,
}

/// Tower is checked first, so it wins where the two areas overlap.
pub fn classify<G: Geometry + ?Sized>(geometry: &G, position: Vec2) -> DropZone {
    if geometry.tower_area().contains(position) {
        DropZone::Tower
    } else if geometry.hole_area().contains(position) {
        DropZone::Hole
    } else {
        DropZone::Neither
    }
}

//! Horizontal tray the blocks are picked from.
//!
//! Slot `i` sits at `origin + (offset_x + i * spacing, 0)`. Picking a block up hands its
//! slot to a fresh block with the same sprite, so the slot count never changes.

use crate::block::{BlockId, BlockState, BlockStore};
use crate::geometry::Vec2;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ScrollTray {
    origin: Vec2,
    spacing: f32,
    margin: f32,
    offset_x: f32,
    slots: Vec<BlockId>,
    first: Option<BlockId>,
    last: Option<BlockId>,
    scroll_enabled: bool,
}

impl ScrollTray {
    pub fn new(origin: Vec2, spacing: f32, margin: f32) -> Self {
        Self {
            origin,
            spacing,
            margin,
            offset_x: 0.0,
            slots: Vec::new(),
            first: None,
            last: None,
            scroll_enabled: true,
        }
    }

    /// Offset of slot `index` from the tray origin; stored as the block's spawn position.
    pub fn slot_offset(&self, index: usize) -> Vec2 {
        Vec2::new(index as f32 * self.spacing, 0.0)
    }

    /// Where slot `index` currently is in the world, scrolling included.
    pub fn slot_world(&self, index: usize) -> Vec2 {
        self.origin + Vec2::new(self.offset_x, 0.0) + self.slot_offset(index)
    }

    /// Index the next pushed block will get.
    pub fn next_index(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, id: BlockId) -> usize {
        self.slots.push(id);
        self.slots.len() - 1
    }

    /// Put `id` into slot `index`, returning the block that held it.
    pub fn replace_slot(&mut self, index: usize, id: BlockId) -> Option<BlockId> {
        let slot = self.slots.get_mut(index)?;
        Some(std::mem::replace(slot, id))
    }

    pub fn slot_of(&self, id: BlockId) -> Option<usize> {
        self.slots.iter().position(|s| *s == id)
    }

    pub fn slots(&self) -> &[BlockId] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Re-read the first/last handles from the slot ends.
    pub fn refresh_bounds(&mut self) {
        self.first = self.slots.first().copied();
        self.last = self.slots.last().copied();
    }

    pub fn first(&self) -> Option<BlockId> {
        self.first
    }

    pub fn last(&self) -> Option<BlockId> {
        self.last
    }

    pub fn current_first_position(&self, store: &BlockStore) -> Option<Vec2> {
        self.first.and_then(|id| store.get(id)).map(|b| b.position)
    }

    pub fn current_last_position(&self, store: &BlockStore) -> Option<Vec2> {
        self.last.and_then(|id| store.get(id)).map(|b| b.position)
    }

    pub fn offset_x(&self) -> f32 {
        self.offset_x
    }

    pub fn scroll_enabled(&self) -> bool {
        self.scroll_enabled
    }

    pub fn set_scroll_enabled(&mut self, enabled: bool) {
        self.scroll_enabled = enabled;
    }

    fn fully_visible(&self, x: f32, (left, right): (f32, f32)) -> bool {
        x - self.margin > left && x + self.margin < right
    }

    /// Move the tray contents by `dx` inside the visible span `view`.
    ///
    /// Content may move right only while the first block is hidden and left only while
    /// the last block is hidden; both checks must pass. Returns whether it moved.
    pub fn scroll_by(&mut self, dx: f32, store: &mut BlockStore, view: (f32, f32)) -> bool {
        if !self.scroll_enabled || dx == 0.0 {
            return false;
        }
        let (Some(first), Some(last)) = (
            self.current_first_position(store),
            self.current_last_position(store),
        ) else {
            return false;
        };
        let can_right = !self.fully_visible(first.x, view) || dx < 0.0;
        let can_left = !self.fully_visible(last.x, view) || dx > 0.0;
        if !(can_right && can_left) {
            return false;
        }
        self.offset_x += dx;
        for id in &self.slots {
            if let Some(b) = store.get_mut(*id) {
                if b.state == BlockState::InTray {
                    b.position.x += dx;
                }
            }
        }
        trace!(dx, offset = self.offset_x, "tray scrolled");
        true
    }

    /// Forget every slot and scroll back to the start.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.first = None;
        self.last = None;
        self.offset_x = 0.0;
        self.scroll_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Sprite;

    fn filled(count: usize) -> (ScrollTray, BlockStore) {
        let mut tray = ScrollTray::new(Vec2::new(2.0, 0.5), 2.0, 1.0);
        let mut store = BlockStore::new();
        for i in 0..count {
            let id = store.spawn(
                Sprite::new(0, Vec2::new(0.75, 0.5)),
                tray.slot_offset(i),
                tray.slot_world(i),
            );
            tray.push(id);
        }
        tray.refresh_bounds();
        (tray, store)
    }

    #[test]
    fn slots_are_spaced_from_origin() {
        let (tray, store) = filled(3);
        assert_eq!(tray.current_first_position(&store), Some(Vec2::new(2.0, 0.5)));
        assert_eq!(tray.current_last_position(&store), Some(Vec2::new(6.0, 0.5)));
        assert_eq!(tray.slot_world(5), Vec2::new(12.0, 0.5));
    }

    #[test]
    fn replacement_takes_over_slot_and_bounds() {
        let (mut tray, mut store) = filled(3);
        let old = tray.slots()[2];
        let new = store.spawn(Sprite::new(0, Vec2::splat(0.5)), tray.slot_offset(2), tray.slot_world(2));
        assert_eq!(tray.replace_slot(2, new), Some(old));
        assert_eq!(tray.slot_of(new), Some(2));
        assert_eq!(tray.slot_of(old), None);
        assert_eq!(tray.last(), Some(old));
        tray.refresh_bounds();
        assert_eq!(tray.last(), Some(new));
        assert_eq!(tray.replace_slot(7, new), None);
    }

    #[test]
    fn short_tray_does_not_scroll() {
        let (mut tray, mut store) = filled(3);
        assert!(!tray.scroll_by(-1.0, &mut store, (0.0, 40.0)));
        assert!(!tray.scroll_by(1.0, &mut store, (0.0, 40.0)));
        assert_eq!(tray.offset_x(), 0.0);
    }

    #[test]
    fn long_tray_scrolls_until_last_shows() {
        let (mut tray, mut store) = filled(10);
        let view = (0.0, 10.0);
        // First visible, last hidden: only leftwards.
        assert!(!tray.scroll_by(1.0, &mut store, view));
        assert!(tray.scroll_by(-4.0, &mut store, view));
        assert_eq!(tray.current_first_position(&store), Some(Vec2::new(-2.0, 0.5)));
        assert!(tray.scroll_by(-10.0, &mut store, view));
        // Last (x = 20 - 14 = 6) is visible now: left is refused, right is fine.
        assert!(!tray.scroll_by(-1.0, &mut store, view));
        assert!(tray.scroll_by(3.0, &mut store, view));
        assert_eq!(tray.offset_x(), -11.0);
    }

    #[test]
    fn disabled_or_busy_blocks_stay_put() {
        let (mut tray, mut store) = filled(10);
        let dragged = tray.slots()[9];
        store.set_state(dragged, BlockState::Dragging);
        tray.set_scroll_enabled(false);
        assert!(!tray.scroll_by(-2.0, &mut store, (0.0, 10.0)));
        tray.set_scroll_enabled(true);
        assert!(tray.scroll_by(-2.0, &mut store, (0.0, 10.0)));
        assert_eq!(store.get(dragged).unwrap().position.x, 20.0);
        assert_eq!(store.get(tray.slots()[0]).unwrap().position.x, 0.0);
    }
}

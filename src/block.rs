//! Blocks and the arena that owns them.

use crate::geometry::{Bounds, Vec2};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Opaque handle, unique per spawned block. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a block looks like: palette colour and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Colour index into the theme palette (0..6).
    pub color: u8,
    pub half_extents: Vec2,
}

impl Sprite {
    pub fn new(color: u8, half_extents: Vec2) -> Self {
        Self {
            color,
            half_extents,
        }
    }
}

/// Observable lifecycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    InTray,
    Dragging,
    /// Released over the tower, waiting for or running its placement.
    TowerEvaluation,
    InTower,
    /// Moving down as part of a cascade.
    Reflowing,
    /// Out of play; only its exit animation is left.
    Removed,
}

/// One draggable block. `position` and `tower_position` use a bottom-centre pivot.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub sprite: Sprite,
    /// Offset of its tray slot from the tray origin.
    pub spawn_position: Vec2,
    /// Last computed stacked position.
    pub tower_position: Vec2,
    /// Current world position.
    pub position: Vec2,
    pub scale: f32,
    pub state: BlockState,
}

impl Block {
    #[inline]
    pub fn extent_y(&self) -> f32 {
        self.sprite.half_extents.y
    }

    /// Visual bounds at the current position and scale.
    pub fn bounds(&self) -> Bounds {
        let half = self.sprite.half_extents * self.scale;
        let center = self.position + Vec2::new(0.0, self.sprite.half_extents.y);
        Bounds::from_center_extents(center, half)
    }

    /// Tray or tower blocks answer to the pointer; everything else is busy.
    pub fn is_resting(&self) -> bool {
        matches!(self.state, BlockState::InTray | BlockState::InTower)
    }
}

/// Arena of live blocks. A block is destroyed once the store no longer holds it.
#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: BTreeMap<BlockId, Block>,
    next_id: u64,
}

/// The store shared by the controller, the tower engine and the animator.
pub type SharedBlocks = Rc<RefCell<BlockStore>>;

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedBlocks {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Spawn a tray block at `position` with its scale at zero, ready for an entry animation.
    pub fn spawn(&mut self, sprite: Sprite, spawn_position: Vec2, position: Vec2) -> BlockId {
        self.next_id += 1;
        let id = BlockId(self.next_id);
        self.blocks.insert(
            id,
            Block {
                id,
                sprite,
                spawn_position,
                tower_position: Vec2::ZERO,
                position,
                scale: 0.0,
                state: BlockState::InTray,
            },
        );
        id
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn state(&self, id: BlockId) -> Option<BlockState> {
        self.blocks.get(&id).map(|b| b.state)
    }

    /// Returns false for destroyed blocks.
    pub fn set_state(&mut self, id: BlockId, state: BlockState) -> bool {
        match self.blocks.get_mut(&id) {
            Some(b) => {
                b.state = state;
                true
            }
            None => false,
        }
    }

    /// Take a block out of play; it stays in the store until its exit animation destroys it.
    pub fn retire(&mut self, id: BlockId) -> bool {
        self.set_state(id, BlockState::Removed)
    }

    pub fn destroy(&mut self, id: BlockId) -> Option<Block> {
        self.blocks.remove(&id)
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Blocks in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Topmost resting block under `point`; later spawns draw over earlier ones.
    pub fn pick_at(&self, point: Vec2) -> Option<BlockId> {
        self.blocks
            .values()
            .rev()
            .find(|b| b.is_resting() && b.bounds().contains(point))
            .map(|b| b.id)
    }
}

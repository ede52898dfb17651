//! Tower reflow engine: the ordered stack of placed blocks.
//!
//! The stack is bottom-to-top in insertion/reflow order. `first`/`last` are read off the
//! stack ends, never stored. Positions use the block pivot (bottom centre): at rest each
//! block sits at the base anchor plus twice the summed half heights of the blocks below.
//!
//! `insert` and `remove` only return once every animation they started and await has
//! ended, and the steps inside one call run strictly one after another: each cascade
//! target depends on where the previous block settled. Callers serialize whole calls
//! (the controller keeps the engine behind an async mutex).

use crate::anim::{Animator, Outcome};
use crate::block::{BlockId, BlockState, SharedBlocks};
use crate::geometry::{Vec2, VerticalBounds};
use crate::notify::{MessageKind, NotificationSink};
use std::rc::Rc;
use tracing::{debug, info, trace};

/// What `insert` did with the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Started a new tower at its drop position.
    Founded,
    /// Appended on top.
    Placed,
    /// A member moved to the top; the gap it left was closed.
    Relocated,
    /// Dropped below the top; thrown away.
    Misplaced,
    /// Outside the viewport, or its slot would be; thrown away.
    Rejected,
    /// Destroyed while its placement was running.
    Interrupted,
    /// Already destroyed or retired before the call.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    NotMember,
    /// Left the stack; `cascaded` blocks above it settled one slot lower.
    Removed { cascaded: usize },
}

pub struct TowerEngine {
    blocks: SharedBlocks,
    animator: Rc<dyn Animator>,
    notifier: Rc<dyn NotificationSink>,
    viewport: VerticalBounds,
    stack: Vec<BlockId>,
    base_anchor: Option<Vec2>,
}

/// Pivot and half height a block above lands on.
#[derive(Debug, Clone, Copy)]
struct Support {
    anchor: Vec2,
    extent: f32,
}

impl Support {
    fn slot(&self) -> Vec2 {
        self.anchor + self.offset()
    }

    fn offset(&self) -> Vec2 {
        Vec2::new(0.0, 2.0 * self.extent)
    }
}

impl TowerEngine {
    pub fn new(
        blocks: SharedBlocks,
        animator: Rc<dyn Animator>,
        notifier: Rc<dyn NotificationSink>,
        viewport: VerticalBounds,
    ) -> Self {
        Self {
            blocks,
            animator,
            notifier,
            viewport,
            stack: Vec::new(),
            base_anchor: None,
        }
    }

    /// Bottom block, or `None` for an empty tower.
    pub fn first(&self) -> Option<BlockId> {
        self.stack.first().copied()
    }

    /// Top block, or `None` for an empty tower.
    pub fn last(&self) -> Option<BlockId> {
        self.stack.last().copied()
    }

    pub fn members(&self) -> &[BlockId] {
        &self.stack
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.stack.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn base_anchor(&self) -> Option<Vec2> {
        self.base_anchor
    }

    pub fn viewport(&self) -> VerticalBounds {
        self.viewport
    }

    fn index_of(&self, id: BlockId) -> Option<usize> {
        self.stack.iter().position(|m| *m == id)
    }

    /// Drop members that no longer exist, except `keep`.
    fn prune(&mut self, keep: BlockId) {
        let store = self.blocks.borrow();
        let before = self.stack.len();
        self.stack.retain(|m| *m == keep || store.contains(*m));
        if self.stack.len() != before {
            debug!(pruned = before - self.stack.len(), "dropped destroyed tower members");
        }
    }

    fn settle(&mut self) {
        if self.stack.is_empty() {
            self.base_anchor = None;
        }
        trace!(first = ?self.first(), last = ?self.last(), len = self.stack.len(), "tower settled");
    }

    /// What a block at `index` rests on: the block below it, or the base anchor.
    fn support_below(&self, index: usize) -> Option<Support> {
        let store = self.blocks.borrow();
        if index == 0 {
            let anchor = self.base_anchor.or_else(|| {
                self.stack
                    .first()
                    .and_then(|id| store.get(*id))
                    .map(|b| b.tower_position)
            })?;
            return Some(Support {
                anchor,
                extent: 0.0,
            });
        }
        let below = store.get(self.stack[index - 1])?;
        Some(Support {
            anchor: below.tower_position,
            extent: below.extent_y(),
        })
    }

    /// Mark a block that came down on `target` as resting. The slot fixes y; x is
    /// wherever the flight actually ended, so the tower sways as it grows.
    fn land(&self, id: BlockId, target: Vec2) -> Option<Vec2> {
        let mut store = self.blocks.borrow_mut();
        let b = store.get_mut(id).filter(|b| b.state != BlockState::Removed)?;
        b.state = BlockState::InTower;
        b.tower_position = Vec2::new(b.position.x, target.y);
        Some(b.tower_position)
    }

    /// Throw a block out of play with the discard animation; nothing waits on it.
    fn discard(&self, id: BlockId) {
        self.blocks.borrow_mut().retire(id);
        drop(self.animator.play_discard(id));
    }

    /// Add `id` on top, start a tower with it, or relocate it if it is already a member.
    pub async fn insert(&mut self, id: BlockId) -> InsertOutcome {
        self.prune(id);
        let found = self
            .blocks
            .borrow()
            .get(id)
            .filter(|b| b.state != BlockState::Removed)
            .map(|b| (b.position, b.extent_y()));
        let Some((position, extent)) = found else {
            debug!(block = %id, "insert of a stale block ignored");
            self.stack.retain(|m| *m != id);
            self.settle();
            return InsertOutcome::Stale;
        };
        let member = self.contains(id);
        let reference = self.stack.iter().rev().copied().find(|m| *m != id);

        let outcome = match reference {
            None => self.found(id, position, member),
            Some(top) => {
                let (top_y, support) = {
                    let store = self.blocks.borrow();
                    let Some(b) = store.get(top) else {
                        return InsertOutcome::Stale;
                    };
                    (
                        b.position.y,
                        Support {
                            anchor: b.tower_position,
                            extent: b.extent_y(),
                        },
                    )
                };
                if position.y >= top_y {
                    self.place(id, position, extent, support, member).await
                } else {
                    self.misplace(id, member).await
                }
            }
        };
        self.settle();
        info!(block = %id, ?outcome, height = self.stack.len(), "insert");
        outcome
    }

    fn found(&mut self, id: BlockId, position: Vec2, member: bool) -> InsertOutcome {
        if !self.viewport.contains(position.y) {
            self.notifier.show(MessageKind::TooHigh);
            self.stack.retain(|m| *m != id);
            self.discard(id);
            return InsertOutcome::Rejected;
        }
        self.base_anchor = Some(position);
        {
            let mut store = self.blocks.borrow_mut();
            if let Some(b) = store.get_mut(id) {
                b.tower_position = position;
                b.state = BlockState::InTower;
            }
        }
        if !member {
            self.stack.push(id);
        }
        // Nothing depends on the founding block's flight yet.
        drop(self.animator.play_placement(id, position, Vec2::ZERO));
        self.notifier.show(MessageKind::Put);
        InsertOutcome::Founded
    }

    async fn place(
        &mut self,
        id: BlockId,
        position: Vec2,
        extent: f32,
        support: Support,
        member: bool,
    ) -> InsertOutcome {
        let target = support.slot();
        // A member below the top ends up one slot lower once its old gap closes.
        let landing = if member && self.last() != Some(id) {
            target.y - 2.0 * extent
        } else {
            target.y
        };
        let fits = self.viewport.contains(position.y)
            && self.viewport.contains_span(landing, landing + 2.0 * extent);
        if !fits {
            self.notifier.show(MessageKind::TooHigh);
            self.discard(id);
            if member {
                self.close_gap(id).await;
            }
            return InsertOutcome::Rejected;
        }

        self.notifier.show(MessageKind::Put);
        {
            let mut store = self.blocks.borrow_mut();
            if let Some(b) = store.get_mut(id) {
                b.tower_position = target;
                b.state = BlockState::TowerEvaluation;
            }
        }
        let outcome = self
            .animator
            .play_placement(id, support.anchor, support.offset())
            .await;
        if outcome == Outcome::Cancelled || self.land(id, target).is_none() {
            debug!(block = %id, "placement interrupted");
            if member {
                self.close_gap(id).await;
            }
            return InsertOutcome::Interrupted;
        }

        if !member {
            self.stack.push(id);
            return InsertOutcome::Placed;
        }
        self.relocate(id).await;
        InsertOutcome::Relocated
    }

    async fn misplace(&mut self, id: BlockId, member: bool) -> InsertOutcome {
        self.notifier.show(MessageKind::Threw);
        self.discard(id);
        if member {
            self.close_gap(id).await;
        }
        InsertOutcome::Misplaced
    }

    /// Take `id` out of the stack and bring every block above it down. Removing a block
    /// that is not a member does nothing and starts no animation.
    pub async fn remove(&mut self, id: BlockId) -> RemoveOutcome {
        self.prune(id);
        let outcome = match self.close_gap(id).await {
            Some(cascaded) => RemoveOutcome::Removed { cascaded },
            None => RemoveOutcome::NotMember,
        };
        self.settle();
        info!(block = %id, ?outcome, height = self.stack.len(), "remove");
        outcome
    }

    /// Remove `id` and cascade the blocks above it; `None` when it is not a member.
    async fn close_gap(&mut self, id: BlockId) -> Option<usize> {
        let index = self.index_of(id)?;
        let support = self.support_below(index);
        let movers: Vec<BlockId> = self.stack[index + 1..].to_vec();
        self.stack.remove(index);
        let Some(support) = support else {
            return Some(0);
        };
        if !movers.is_empty() {
            self.notifier.show(MessageKind::Fall);
        }
        Some(self.cascade(&movers, support).await)
    }

    /// Move a member that was just placed on top to the end of the stack, then close
    /// the gap at its old slot. It takes part in the cascade as the last block.
    async fn relocate(&mut self, id: BlockId) {
        let Some(index) = self.index_of(id) else {
            return;
        };
        self.stack.remove(index);
        self.stack.push(id);
        let movers: Vec<BlockId> = self.stack[index..].to_vec();
        // It was the top already: nothing moved, nothing to close.
        if movers.len() <= 1 {
            return;
        }
        let Some(support) = self.support_below(index) else {
            return;
        };
        self.notifier.show(MessageKind::Fall);
        self.cascade(&movers, support).await;
    }

    /// Drop `movers` one by one onto `support`, bottom first. Each step is awaited
    /// before the next target is computed. Returns how many settled.
    async fn cascade(&mut self, movers: &[BlockId], mut support: Support) -> usize {
        let mut settled = 0;
        for &id in movers {
            let target = support.slot();
            let (extent, state) = match self.blocks.borrow().get(id) {
                Some(b) if b.state != BlockState::Removed => (b.extent_y(), b.state),
                _ => {
                    self.stack.retain(|m| *m != id);
                    continue;
                }
            };
            // A member held by the pointer keeps its slot; its release will place it again.
            if state == BlockState::Dragging {
                if let Some(b) = self.blocks.borrow_mut().get_mut(id) {
                    b.tower_position = target;
                }
                support = Support {
                    anchor: target,
                    extent,
                };
                settled += 1;
                continue;
            }
            if !self.viewport.contains_span(target.y, target.y + 2.0 * extent) {
                debug!(block = %id, ?target, "cascade pushed block out of the viewport");
                self.stack.retain(|m| *m != id);
                self.discard(id);
                continue;
            }
            {
                let mut store = self.blocks.borrow_mut();
                if let Some(b) = store.get_mut(id) {
                    b.tower_position = target;
                    b.state = BlockState::Reflowing;
                }
            }
            trace!(block = %id, ?target, "cascade step");
            let outcome = self
                .animator
                .play_cascade_drop(id, support.anchor, support.offset())
                .await;
            let landed = match outcome {
                Outcome::Finished => self.land(id, target),
                Outcome::Cancelled => None,
            };
            let Some(anchor) = landed else {
                debug!(block = %id, "cascade step interrupted");
                self.stack.retain(|m| *m != id);
                continue;
            };
            support = Support { anchor, extent };
            settled += 1;
        }
        settled
    }
}

//! Game controller: turns pick-up and release input into tray, tower and hole actions.
//!
//! Each block walks `InTray -> Dragging -> TowerEvaluation -> InTower` when dropped on the
//! tower, or ends in `Removed` when dropped in the hole or anywhere else. Releases run as
//! local tasks; the tower engine sits behind a FIFO async mutex so tower operations never
//! interleave while tray updates and messages carry on around them.

use crate::anim::Animator;
use crate::block::{BlockId, BlockState, SharedBlocks, Sprite};
use crate::classify::{DropZone, classify};
use crate::config::GameConfig;
use crate::geometry::{Geometry, Layout, Vec2};
use crate::input::{InputDispatcher, InputEvent, InputHandler, SubscriptionId};
use crate::notify::{MessageKind, NotificationSink};
use crate::tower::{InsertOutcome, RemoveOutcome, TowerEngine};
use crate::tray::ScrollTray;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Everything the controller works with, handed over in one piece.
pub struct ControllerDeps {
    pub config: GameConfig,
    pub layout: Layout,
    pub blocks: SharedBlocks,
    pub animator: Rc<dyn Animator>,
    pub notifier: Rc<dyn NotificationSink>,
}

/// How a release ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Tower(InsertOutcome),
    Hole(RemoveOutcome),
    Thrown(RemoveOutcome),
    /// Not a dragging block; nothing happened.
    Ignored,
}

pub struct GameController {
    config: GameConfig,
    layout: Layout,
    blocks: SharedBlocks,
    animator: Rc<dyn Animator>,
    notifier: Rc<dyn NotificationSink>,
    tray: RefCell<ScrollTray>,
    tower: Mutex<TowerEngine>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl GameController {
    pub fn new(deps: ControllerDeps) -> Self {
        let ControllerDeps {
            config,
            layout,
            blocks,
            animator,
            notifier,
        } = deps;
        let tray = ScrollTray::new(layout.tray_origin, config.tray_spacing, config.scroll_margin);
        let tower = TowerEngine::new(
            blocks.clone(),
            animator.clone(),
            notifier.clone(),
            layout.viewport(),
        );
        Self {
            config,
            layout,
            blocks,
            animator,
            notifier,
            tray: RefCell::new(tray),
            tower: Mutex::new(tower),
            subscription: Cell::new(None),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn blocks(&self) -> &SharedBlocks {
        &self.blocks
    }

    pub fn tray(&self) -> Ref<'_, ScrollTray> {
        self.tray.borrow()
    }

    /// Tower members bottom to top, or `None` while a tower operation runs.
    pub fn tower_members(&self) -> Option<Vec<BlockId>> {
        self.tower.try_lock().ok().map(|t| t.members().to_vec())
    }

    pub fn tower_busy(&self) -> bool {
        self.tower.try_lock().is_err()
    }

    /// Waits for running tower operations, then reads the stack.
    pub async fn settled_tower(&self) -> Vec<BlockId> {
        self.tower.lock().await.members().to_vec()
    }

    fn spawn_into_slot(&self, index: usize, sprite: Sprite) -> BlockId {
        let (offset, world) = {
            let tray = self.tray.borrow();
            (tray.slot_offset(index), tray.slot_world(index))
        };
        let id = self.blocks.borrow_mut().spawn(sprite, offset, world);
        self.animator.play_entry(id);
        id
    }

    /// Fill the tray with one block per configured sprite, pausing between spawns.
    pub async fn populate(&self) {
        for (i, sprite) in self.config.sprites.iter().enumerate() {
            let index = self.tray.borrow().next_index();
            let id = self.spawn_into_slot(index, *sprite);
            self.tray.borrow_mut().push(id);
            debug!(block = %id, slot = index, "tray spawn");
            if i + 1 < self.config.sprites.len() && !self.config.spawn_delay.is_zero() {
                tokio::time::sleep(self.config.spawn_delay).await;
            }
        }
        self.tray.borrow_mut().refresh_bounds();
        info!(blocks = self.config.sprites.len(), "tray populated");
    }

    /// Start dragging `id`. Refused for busy blocks and for tower blocks while the tower
    /// is reflowing.
    pub fn pick_up(&self, id: BlockId) -> bool {
        let Some(block) = self.blocks.borrow().get(id).cloned() else {
            return false;
        };
        match block.state {
            BlockState::InTray => {}
            BlockState::InTower if !self.animator.is_animating(id) && !self.tower_busy() => {}
            state => {
                debug!(block = %id, ?state, "pick-up refused");
                return false;
            }
        }
        self.blocks.borrow_mut().set_state(id, BlockState::Dragging);
        self.notifier.show(MessageKind::PickUp);

        let slot = self.tray.borrow().slot_of(id);
        if let Some(index) = slot {
            let replacement = self.spawn_into_slot(index, block.sprite);
            let mut tray = self.tray.borrow_mut();
            tray.replace_slot(index, replacement);
            tray.refresh_bounds();
            debug!(block = %id, %replacement, slot = index, "tray slot refilled");
        }
        self.tray.borrow_mut().set_scroll_enabled(false);
        true
    }

    /// Move a dragging block; anything else is left alone.
    pub fn drag_to(&self, id: BlockId, position: Vec2) -> bool {
        match self.blocks.borrow_mut().get_mut(id) {
            Some(b) if b.state == BlockState::Dragging => {
                b.position = position;
                true
            }
            _ => false,
        }
    }

    /// Drop `id` where it is. Returns once every animation the drop awaits has ended.
    pub async fn release(&self, id: BlockId) -> ReleaseOutcome {
        self.tray.borrow_mut().set_scroll_enabled(true);
        let position = match self.blocks.borrow().get(id) {
            Some(b) if b.state == BlockState::Dragging => b.position,
            other => {
                debug!(block = %id, state = ?other.map(|b| b.state), "stale release ignored");
                return ReleaseOutcome::Ignored;
            }
        };
        let zone = classify(&self.layout, position);
        debug!(block = %id, ?position, ?zone, "release");
        match zone {
            DropZone::Tower => {
                self.blocks.borrow_mut().set_state(id, BlockState::TowerEvaluation);
                let mut tower = self.tower.lock().await;
                ReleaseOutcome::Tower(tower.insert(id).await)
            }
            DropZone::Hole => {
                self.notifier.show(MessageKind::Disappeared);
                self.blocks.borrow_mut().retire(id);
                drop(self.animator.play_dispose(id, self.layout.hole_target));
                let mut tower = self.tower.lock().await;
                ReleaseOutcome::Hole(tower.remove(id).await)
            }
            DropZone::Neither => {
                self.notifier.show(MessageKind::Threw);
                self.blocks.borrow_mut().retire(id);
                drop(self.animator.play_discard(id));
                let mut tower = self.tower.lock().await;
                ReleaseOutcome::Thrown(tower.remove(id).await)
            }
        }
    }

    /// Scroll the tray contents by `dx` world units.
    pub fn scroll_tray(&self, dx: f32) -> bool {
        let mut store = self.blocks.borrow_mut();
        self.tray
            .borrow_mut()
            .scroll_by(dx, &mut store, self.layout.visible_x())
    }

    /// Start receiving pointer events from `dispatcher`. Releases are spawned on the
    /// current `LocalSet`.
    pub fn activate(self: &Rc<Self>, dispatcher: &InputDispatcher) {
        if self.subscription.get().is_some() {
            return;
        }
        let handler: Rc<dyn InputHandler> = self.clone();
        self.subscription.set(Some(dispatcher.subscribe(handler)));
    }

    pub fn deactivate(&self, dispatcher: &InputDispatcher) {
        if let Some(sub) = self.subscription.take() {
            dispatcher.unsubscribe(sub);
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.get().is_some()
    }
}

impl InputHandler for GameController {
    fn handle(self: Rc<Self>, event: InputEvent) {
        match event {
            InputEvent::PickUp(id) => {
                self.pick_up(id);
            }
            InputEvent::Release(id) => {
                tokio::task::spawn_local(async move {
                    let outcome = self.release(id).await;
                    debug!(block = %id, ?outcome, "release handled");
                });
            }
        }
    }
}

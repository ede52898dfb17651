//! Whole games driven through the public API, the way the terminal host drives them.

use stacktui::anim::{Animator, InstantAnimator, TweenAnimator};
use stacktui::block::{BlockId, BlockState, BlockStore, SharedBlocks};
use stacktui::config::{AnimationConfig, GameConfig, NotificationConfig, default_sprites};
use stacktui::controller::{ControllerDeps, GameController, ReleaseOutcome};
use stacktui::geometry::{Layout, Vec2};
use stacktui::input::{InputDispatcher, InputEvent};
use stacktui::notify::{MessageKind, NotificationQueue};
use stacktui::tower::{InsertOutcome, RemoveOutcome};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

const FRAME: Duration = Duration::from_millis(16);
const HOLE: Vec2 = Vec2::new(35.0, 5.0);
const NOWHERE: Vec2 = Vec2::new(27.0, 10.0);

fn config(count: usize) -> GameConfig {
    GameConfig {
        sprites: default_sprites(count),
        spawn_delay: Duration::ZERO,
        ..GameConfig::default()
    }
}

fn controller(
    blocks: &SharedBlocks,
    animator: Rc<dyn Animator>,
    queue: &Rc<RefCell<NotificationQueue>>,
) -> Rc<GameController> {
    Rc::new(GameController::new(ControllerDeps {
        config: config(5),
        layout: Layout::for_world(40.0, 20.0),
        blocks: blocks.clone(),
        animator,
        notifier: queue.clone(),
    }))
}

async fn drop_at(ctl: &GameController, id: BlockId, at: Vec2) -> ReleaseOutcome {
    assert!(ctl.pick_up(id), "could not pick up {id}");
    assert!(ctl.drag_to(id, at));
    ctl.release(id).await
}

fn tower_y(blocks: &SharedBlocks, id: BlockId) -> f32 {
    blocks.borrow().get(id).map(|b| b.tower_position.y).unwrap()
}

async fn let_tasks_run() {
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn build_dig_and_refound_a_tower() {
    let blocks = BlockStore::shared();
    let animator = Rc::new(InstantAnimator::new(blocks.clone()));
    let queue = Rc::new(RefCell::new(NotificationQueue::new(NotificationConfig::default())));
    let ctl = controller(&blocks, animator, &queue);
    ctl.populate().await;
    let slot = |i: usize| ctl.tray().slots()[i];

    let b1 = slot(0);
    let b2 = slot(1);
    let b3 = slot(2);
    assert_eq!(
        drop_at(&ctl, b1, Vec2::new(10.0, 5.0)).await,
        ReleaseOutcome::Tower(InsertOutcome::Founded)
    );
    assert_eq!(
        drop_at(&ctl, b2, Vec2::new(11.0, 8.0)).await,
        ReleaseOutcome::Tower(InsertOutcome::Placed)
    );
    assert_eq!(
        drop_at(&ctl, b3, Vec2::new(9.0, 10.0)).await,
        ReleaseOutcome::Tower(InsertOutcome::Placed)
    );
    assert_eq!(ctl.tower_members(), Some(vec![b1, b2, b3]));
    assert_eq!(tower_y(&blocks, b3), 7.0);
    // Every pick-up refilled its slot.
    assert_eq!(ctl.tray().len(), 5);
    assert!(ctl.tray().slots().iter().all(|id| ![b1, b2, b3].contains(id)));

    // Six messages, one started, the rest wait their turn.
    {
        let mut q = queue.borrow_mut();
        assert_eq!(q.started(), 1);
        assert_eq!(q.active(), Some(MessageKind::PickUp));
        assert_eq!(q.pending_len(), 5);
        for _ in 0..6 {
            q.tick(Duration::from_millis(500));
        }
        assert_eq!(q.started(), 6);
        assert!(q.is_idle());
        let serials: Vec<u64> = q.toasts().iter().map(|t| t.serial).collect();
        assert_eq!(serials, vec![5, 6]);
        assert_eq!(q.toasts()[1].kind, MessageKind::Put);
    }

    assert_eq!(
        drop_at(&ctl, b2, HOLE).await,
        ReleaseOutcome::Hole(RemoveOutcome::Removed { cascaded: 1 })
    );
    assert_eq!(ctl.tower_members(), Some(vec![b1, b3]));
    assert_eq!(tower_y(&blocks, b3), 6.0);
    {
        let q = queue.borrow();
        assert_eq!(q.active(), Some(MessageKind::PickUp));
        assert_eq!(
            q.pending().collect::<Vec<_>>(),
            vec![MessageKind::Disappeared, MessageKind::Fall]
        );
    }

    assert_eq!(
        drop_at(&ctl, b1, NOWHERE).await,
        ReleaseOutcome::Thrown(RemoveOutcome::Removed { cascaded: 1 })
    );
    assert_eq!(tower_y(&blocks, b3), 5.0);
    assert_eq!(
        drop_at(&ctl, b3, NOWHERE).await,
        ReleaseOutcome::Thrown(RemoveOutcome::Removed { cascaded: 0 })
    );
    assert_eq!(ctl.tower_members(), Some(Vec::new()));

    // An empty tower starts over wherever the next block lands.
    let b4 = slot(3);
    assert_eq!(
        drop_at(&ctl, b4, Vec2::new(12.0, 4.0)).await,
        ReleaseOutcome::Tower(InsertOutcome::Founded)
    );
    assert_eq!(
        blocks.borrow().get(b4).map(|b| b.tower_position),
        Some(Vec2::new(12.0, 4.0))
    );
    // Only the tray and the new tower block are left.
    assert_eq!(blocks.borrow().len(), 6);
}

#[tokio::test]
async fn frame_stepped_drops_through_the_dispatcher() {
    let blocks = BlockStore::shared();
    let animator = Rc::new(TweenAnimator::new(blocks.clone(), AnimationConfig::default()));
    let queue = Rc::new(RefCell::new(NotificationQueue::new(NotificationConfig::default())));
    let ctl = controller(&blocks, animator.clone(), &queue);
    let dispatcher = InputDispatcher::new();
    ctl.activate(&dispatcher);

    LocalSet::new()
        .run_until(async {
            ctl.populate().await;
            let b1 = ctl.tray().slots()[0];
            dispatcher.dispatch(InputEvent::PickUp(b1));
            ctl.drag_to(b1, Vec2::new(10.0, 5.0));
            dispatcher.dispatch(InputEvent::Release(b1));
            let_tasks_run().await;
            assert_eq!(ctl.tower_members(), Some(vec![b1]));
            for _ in 0..300 {
                if !animator.is_animating(b1) {
                    break;
                }
                animator.advance(FRAME);
                let_tasks_run().await;
            }
            assert!(!animator.is_animating(b1));

            let b2 = ctl.tray().slots()[1];
            dispatcher.dispatch(InputEvent::PickUp(b2));
            ctl.drag_to(b2, Vec2::new(10.0, 8.0));
            dispatcher.dispatch(InputEvent::Release(b2));
            let_tasks_run().await;
            // Mid-flight: the tower is locked and the block is under evaluation.
            assert!(ctl.tower_busy());
            assert_eq!(blocks.borrow().state(b2), Some(BlockState::TowerEvaluation));

            for _ in 0..300 {
                if ctl.tower_members() == Some(vec![b1, b2]) {
                    break;
                }
                animator.advance(FRAME);
                let_tasks_run().await;
            }
            assert_eq!(ctl.settled_tower().await, vec![b1, b2]);
            let store = blocks.borrow();
            let landed = store.get(b2).unwrap();
            assert_eq!(landed.state, BlockState::InTower);
            assert_eq!(landed.tower_position.y, 6.0);
            assert!((landed.position.y - 6.0).abs() < 1e-3);
        })
        .await;

    ctl.deactivate(&dispatcher);
    assert_eq!(dispatcher.subscribers(), 0);
}

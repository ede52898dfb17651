//! Animation driver: awaitable completions, the frame-driven tween animator, and an
//! instant animator for headless runs.
//!
//! Every `play_*` call that moves or removes a block hands back a [`Completion`]. The
//! producer keeps the sending half; finishing the tween resolves it with
//! [`Outcome::Finished`], dropping the tween (block destroyed, tween superseded, animator
//! cleared) resolves it with [`Outcome::Cancelled`]. Callers that do not care simply drop it.

use crate::block::{BlockId, SharedBlocks};
use crate::config::AnimationConfig;
use crate::geometry::Vec2;
use std::cell::{Cell, RefCell};
use std::f32::consts::FRAC_PI_2;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Cancelled,
}

/// Resolves when the animation it belongs to ends.
#[derive(Debug)]
pub struct Completion {
    rx: Option<oneshot::Receiver<()>>,
}

/// Sending half of a [`Completion`].
#[derive(Debug)]
pub struct Signal(oneshot::Sender<()>);

impl Signal {
    pub fn complete(self) {
        // The awaiting side may be gone (fire-and-forget); that is fine.
        let _ = self.0.send(());
    }
}

impl Completion {
    pub fn channel() -> (Signal, Self) {
        let (tx, rx) = oneshot::channel();
        (Signal(tx), Self { rx: Some(rx) })
    }

    /// Already finished.
    pub fn finished() -> Self {
        Self { rx: None }
    }

    /// Already cancelled.
    pub fn cancelled() -> Self {
        let (signal, completion) = Self::channel();
        drop(signal);
        completion
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        match self.rx.as_mut() {
            None => Poll::Ready(Outcome::Finished),
            Some(rx) => Pin::new(rx).poll(cx).map(|r| match r {
                Ok(()) => Outcome::Finished,
                Err(_) => Outcome::Cancelled,
            }),
        }
    }
}

/// Per-block animation driver the core talks to.
pub trait Animator {
    /// Spawn pop-in. Nothing waits on it.
    fn play_entry(&self, block: BlockId);
    /// Fly onto the tower, landing at `target + offset`.
    fn play_placement(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion;
    /// Shorter hop down to `target + offset` during a cascade.
    fn play_cascade_drop(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion;
    /// Shrink away; the block is destroyed when it finishes.
    fn play_discard(&self, block: BlockId) -> Completion;
    /// Fly into the hole at `target`; the block is destroyed when it finishes.
    fn play_dispose(&self, block: BlockId, target: Vec2) -> Completion;
    /// True while the block is moving or shrinking.
    fn is_animating(&self, block: BlockId) -> bool;
    fn cancel_all(&self);
    /// Step time-driven animations; a no-op for drivers that finish instantly.
    fn advance(&self, _dt: Duration) {}
}

/// Easing curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    InSine,
    InQuad,
    OutQuad,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InSine => 1.0 - (t * FRAC_PI_2).cos(),
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
        }
    }
}

/// Quadratic curve from `a` to `c` pulled towards `b`.
fn curve(a: Vec2, b: Vec2, c: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    a * (u * u) + b * (2.0 * u * t) + c * (t * t)
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    Grow,
    Shrink,
    Flight {
        start: Vec2,
        peak: Vec2,
        end: Vec2,
        shrink: bool,
    },
}

impl Motion {
    fn moves(&self) -> bool {
        matches!(self, Self::Flight { .. })
    }

    fn scales(&self) -> bool {
        matches!(
            self,
            Self::Grow | Self::Shrink | Self::Flight { shrink: true, .. }
        )
    }

    fn overlaps(&self, other: &Self) -> bool {
        (self.moves() && other.moves()) || (self.scales() && other.scales())
    }
}

#[derive(Debug)]
struct Tween {
    block: BlockId,
    motion: Motion,
    from_scale: f32,
    elapsed: Duration,
    duration: Duration,
    ease: Ease,
    destroy: bool,
    done: Option<Signal>,
}

impl Tween {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        }
    }
}

/// Tweens stepped by the host's frame loop.
#[derive(Debug)]
pub struct TweenAnimator {
    blocks: SharedBlocks,
    config: AnimationConfig,
    tweens: RefCell<Vec<Tween>>,
    rng: Cell<u32>,
}

impl TweenAnimator {
    pub fn new(blocks: SharedBlocks, config: AnimationConfig) -> Self {
        Self {
            blocks,
            config,
            tweens: RefCell::new(Vec::new()),
            rng: Cell::new(0x1234_5678),
        }
    }

    /// Same LCG as a tetromino bag; deterministic per animator.
    fn next_unit(&self) -> f32 {
        let next = self.rng.get().wrapping_mul(1_103_515_245).wrapping_add(12345);
        self.rng.set(next);
        let r = (next >> 16) & 0x7fff;
        (r as f32 / 32767.0) * 2.0 - 1.0
    }

    fn jitter(&self, width: f32) -> f32 {
        self.next_unit() * self.config.jitter * width
    }

    fn start(
        &self,
        block: BlockId,
        motion: impl FnOnce(Vec2, f32) -> Motion,
        duration: Duration,
        ease: Ease,
        destroy: bool,
    ) -> Completion {
        let (position, scale) = match self.blocks.borrow().get(block) {
            Some(b) => (b.position, b.scale),
            None => return Completion::cancelled(),
        };
        let motion = motion(position, scale);
        let mut tweens = self.tweens.borrow_mut();
        // Superseded tweens drop their signal, which cancels whoever waits on them.
        tweens.retain(|t| t.block != block || !t.motion.overlaps(&motion));
        let (done, completion) = Completion::channel();
        trace!(%block, ?motion, ?duration, "tween");
        tweens.push(Tween {
            block,
            motion,
            from_scale: scale,
            elapsed: Duration::ZERO,
            duration,
            ease,
            destroy,
            done: Some(done),
        });
        completion
    }

    fn flight(&self, block: BlockId, end: Vec2, duration: Duration, shrink: bool, ease: Ease) -> Completion {
        let width = self
            .blocks
            .borrow()
            .get(block)
            .map(|b| b.sprite.half_extents.x * 2.0)
            .unwrap_or(0.0);
        let end = end + Vec2::new(self.jitter(width), 0.0);
        let peak_offset = self.config.peak_offset;
        self.start(
            block,
            |start, _| Motion::Flight {
                start,
                peak: start + Vec2::new(0.0, peak_offset),
                end,
                shrink,
            },
            duration,
            ease,
            shrink,
        )
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.borrow().len()
    }
}

impl Animator for TweenAnimator {
    fn play_entry(&self, block: BlockId) {
        drop(self.start(block, |_, _| Motion::Grow, self.config.entry, Ease::OutQuad, false));
    }

    fn play_placement(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion {
        self.flight(block, target + offset, self.config.placement, false, Ease::InSine)
    }

    fn play_cascade_drop(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion {
        self.flight(block, target + offset, self.config.cascade, false, Ease::InSine)
    }

    fn play_discard(&self, block: BlockId) -> Completion {
        self.start(block, |_, _| Motion::Shrink, self.config.discard, Ease::OutQuad, true)
    }

    fn play_dispose(&self, block: BlockId, target: Vec2) -> Completion {
        self.flight(block, target, self.config.dispose, true, Ease::InQuad)
    }

    fn is_animating(&self, block: BlockId) -> bool {
        self.tweens
            .borrow()
            .iter()
            .any(|t| t.block == block && !matches!(t.motion, Motion::Grow))
    }

    fn cancel_all(&self) {
        self.tweens.borrow_mut().clear();
    }

    fn advance(&self, dt: Duration) {
        let mut tweens = self.tweens.borrow_mut();
        let mut store = self.blocks.borrow_mut();
        let mut doomed = Vec::new();
        tweens.retain_mut(|tween| {
            let Some(block) = store.get_mut(tween.block) else {
                return false;
            };
            tween.elapsed += dt;
            let t = tween.progress();
            let k = tween.ease.apply(t);
            match tween.motion {
                Motion::Grow => block.scale = tween.from_scale + (1.0 - tween.from_scale) * k,
                Motion::Shrink => block.scale = tween.from_scale * (1.0 - k),
                Motion::Flight {
                    start,
                    peak,
                    end,
                    shrink,
                } => {
                    block.position = curve(start, peak, end, k);
                    if shrink {
                        block.scale = tween.from_scale * (1.0 - k);
                    }
                }
            }
            if t < 1.0 {
                return true;
            }
            if tween.destroy {
                doomed.push(tween.block);
            }
            if let Some(done) = tween.done.take() {
                done.complete();
            }
            false
        });
        for id in doomed {
            trace!(block = %id, "destroyed after exit animation");
            store.destroy(id);
        }
    }
}

/// What an [`InstantAnimator`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCall {
    Entry(BlockId),
    Placement {
        block: BlockId,
        target: Vec2,
        offset: Vec2,
    },
    CascadeDrop {
        block: BlockId,
        target: Vec2,
        offset: Vec2,
    },
    Discard(BlockId),
    Dispose {
        block: BlockId,
        target: Vec2,
    },
}

/// Applies end states on the spot and records every call.
#[derive(Debug)]
pub struct InstantAnimator {
    blocks: SharedBlocks,
    calls: RefCell<Vec<AnimationCall>>,
}

impl InstantAnimator {
    pub fn new(blocks: SharedBlocks) -> Self {
        Self {
            blocks,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<AnimationCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn land(&self, block: BlockId, at: Vec2) -> Completion {
        match self.blocks.borrow_mut().get_mut(block) {
            Some(b) => {
                b.position = at;
                Completion::finished()
            }
            None => Completion::cancelled(),
        }
    }

    fn vanish(&self, block: BlockId) -> Completion {
        match self.blocks.borrow_mut().destroy(block) {
            Some(_) => Completion::finished(),
            None => Completion::cancelled(),
        }
    }
}

impl Animator for InstantAnimator {
    fn play_entry(&self, block: BlockId) {
        self.calls.borrow_mut().push(AnimationCall::Entry(block));
        if let Some(b) = self.blocks.borrow_mut().get_mut(block) {
            b.scale = 1.0;
        }
    }

    fn play_placement(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion {
        self.calls.borrow_mut().push(AnimationCall::Placement {
            block,
            target,
            offset,
        });
        self.land(block, target + offset)
    }

    fn play_cascade_drop(&self, block: BlockId, target: Vec2, offset: Vec2) -> Completion {
        self.calls.borrow_mut().push(AnimationCall::CascadeDrop {
            block,
            target,
            offset,
        });
        self.land(block, target + offset)
    }

    fn play_discard(&self, block: BlockId) -> Completion {
        self.calls.borrow_mut().push(AnimationCall::Discard(block));
        self.vanish(block)
    }

    fn play_dispose(&self, block: BlockId, target: Vec2) -> Completion {
        self.calls
            .borrow_mut()
            .push(AnimationCall::Dispose { block, target });
        self.vanish(block)
    }

    fn is_animating(&self, _block: BlockId) -> bool {
        false
    }

    fn cancel_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockStore, Sprite};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (SharedBlocks, BlockId, TweenAnimator) {
        let blocks = BlockStore::shared();
        let id = blocks
            .borrow_mut()
            .spawn(Sprite::new(1, Vec2::new(0.75, 0.5)), Vec2::ZERO, Vec2::new(0.0, 5.0));
        let animator = TweenAnimator::new(blocks.clone(), AnimationConfig::default());
        (blocks, id, animator)
    }

    #[test]
    fn easing_endpoints() {
        for ease in [Ease::Linear, Ease::InSine, Ease::InQuad, Ease::OutQuad] {
            assert!(ease.apply(0.0).abs() < 1e-6);
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!(Ease::InQuad.apply(0.5) < 0.5);
        assert!(Ease::OutQuad.apply(0.5) > 0.5);
    }

    #[tokio::test]
    async fn completion_states() {
        assert_eq!(Completion::finished().await, Outcome::Finished);
        assert_eq!(Completion::cancelled().await, Outcome::Cancelled);
        let (signal, completion) = Completion::channel();
        signal.complete();
        assert_eq!(completion.await, Outcome::Finished);
    }

    #[tokio::test]
    async fn placement_lands_on_target_height() {
        let (blocks, id, animator) = setup();
        let done = animator.play_placement(id, Vec2::new(3.0, 1.0), Vec2::new(0.0, 1.0));
        assert!(animator.is_animating(id));
        animator.advance(ms(300));
        let mid = blocks.borrow().get(id).unwrap().position;
        assert!(mid.y != 5.0 && mid.y != 2.0);
        animator.advance(ms(300));
        assert_eq!(done.await, Outcome::Finished);
        let end = blocks.borrow().get(id).unwrap().position;
        assert!((end.y - 2.0).abs() < 1e-5);
        // Jitter stays within the configured fraction of the block width.
        assert!((end.x - 3.0).abs() <= 0.45 * 1.5 + 1e-5);
        assert!(!animator.is_animating(id));
    }

    #[tokio::test]
    async fn discard_destroys_block() {
        let (blocks, id, animator) = setup();
        blocks.borrow_mut().get_mut(id).unwrap().scale = 1.0;
        let done = animator.play_discard(id);
        animator.advance(ms(250));
        assert!(blocks.borrow().get(id).unwrap().scale < 1.0);
        animator.advance(ms(250));
        assert_eq!(done.await, Outcome::Finished);
        assert!(!blocks.borrow().contains(id));
    }

    #[tokio::test]
    async fn destroyed_block_cancels_its_tween() {
        let (blocks, id, animator) = setup();
        let done = animator.play_cascade_drop(id, Vec2::ZERO, Vec2::ZERO);
        blocks.borrow_mut().destroy(id);
        animator.advance(ms(16));
        assert_eq!(animator.active_tweens(), 0);
        assert_eq!(done.await, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn new_flight_supersedes_old_but_keeps_growth() {
        let (_blocks, id, animator) = setup();
        animator.play_entry(id);
        let first = animator.play_placement(id, Vec2::ZERO, Vec2::ZERO);
        let second = animator.play_cascade_drop(id, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(animator.active_tweens(), 2);
        assert_eq!(first.await, Outcome::Cancelled);
        animator.advance(ms(300));
        assert_eq!(second.await, Outcome::Finished);
    }

    #[tokio::test]
    async fn missing_block_is_cancelled_up_front() {
        let (blocks, id, animator) = setup();
        blocks.borrow_mut().destroy(id);
        assert_eq!(animator.play_discard(id).await, Outcome::Cancelled);
        assert_eq!(animator.active_tweens(), 0);
    }

    #[test]
    fn entry_grows_to_full_scale() {
        let (blocks, id, animator) = setup();
        animator.play_entry(id);
        assert!(!animator.is_animating(id));
        animator.advance(ms(200));
        assert!((blocks.borrow().get(id).unwrap().scale - 1.0).abs() < 1e-6);
        assert_eq!(animator.active_tweens(), 0);
    }

    #[tokio::test]
    async fn cancel_all_releases_waiters() {
        let (_blocks, id, animator) = setup();
        let done = animator.play_placement(id, Vec2::ZERO, Vec2::ZERO);
        animator.cancel_all();
        assert_eq!(done.await, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn instant_animator_records_and_applies() {
        let blocks = BlockStore::shared();
        let id = blocks
            .borrow_mut()
            .spawn(Sprite::new(0, Vec2::splat(0.5)), Vec2::ZERO, Vec2::ZERO);
        let animator = InstantAnimator::new(blocks.clone());
        animator.play_entry(id);
        let target = Vec2::new(1.0, 2.0);
        let offset = Vec2::new(0.0, 1.0);
        assert_eq!(animator.play_placement(id, target, offset).await, Outcome::Finished);
        assert_eq!(blocks.borrow().get(id).unwrap().position, Vec2::new(1.0, 3.0));
        assert_eq!(animator.play_discard(id).await, Outcome::Finished);
        assert!(!blocks.borrow().contains(id));
        assert_eq!(animator.play_discard(id).await, Outcome::Cancelled);
        assert_eq!(
            animator.calls(),
            vec![
                AnimationCall::Entry(id),
                AnimationCall::Placement { block: id, target, offset },
                AnimationCall::Discard(id),
                AnimationCall::Discard(id),
            ]
        );
    }
}

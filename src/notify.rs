//! Notification queue: one message starts at a time, strictly FIFO.
//!
//! `show` only enqueues. Starting a message turns it into a [`Toast`] and closes a gate
//! for `next_delay`; when the gate opens the next pending message starts. Toasts live on
//! after the gate opens (hold, then fade), so several may be visible at once.

use crate::config::NotificationConfig;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// User-facing status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PickUp,
    Put,
    Threw,
    Fall,
    TooHigh,
    Disappeared,
}

impl MessageKind {
    pub const ALL: [Self; 6] = [
        Self::PickUp,
        Self::Put,
        Self::Threw,
        Self::Fall,
        Self::TooHigh,
        Self::Disappeared,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Self::PickUp => "Picked up!",
            Self::Put => "Placed on the tower",
            Self::Threw => "Thrown away",
            Self::Fall => "The tower settles...",
            Self::TooHigh => "Too high!",
            Self::Disappeared => "Gone down the hole",
        }
    }
}

/// Where the core sends messages. Fire-and-forget.
pub trait NotificationSink {
    fn show(&self, kind: MessageKind);
}

/// A started message on its way up and out.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    /// Start order, unique per queue.
    pub serial: u64,
    pub kind: MessageKind,
    pub age: Duration,
}

impl Toast {
    /// True once the toast entered its fade.
    pub fn fading(&self, config: &NotificationConfig) -> bool {
        self.age >= config.hold
    }

    /// How far it rose so far, in world units.
    pub fn rise(&self, config: &NotificationConfig) -> f32 {
        if config.rise_time.is_zero() {
            return config.rise;
        }
        let t = (self.age.as_secs_f32() / config.rise_time.as_secs_f32()).min(1.0);
        config.rise * t
    }
}

#[derive(Debug)]
pub struct NotificationQueue {
    config: NotificationConfig,
    pending: VecDeque<MessageKind>,
    /// Time left until the next message may start; `None` when idle.
    gate: Option<Duration>,
    toasts: Vec<Toast>,
    started: u64,
}

impl NotificationQueue {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            gate: None,
            toasts: Vec::new(),
            started: 0,
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn push(&mut self, kind: MessageKind) {
        self.pending.push_back(kind);
        if self.gate.is_none() {
            self.start_next();
        }
    }

    fn start_next(&mut self) {
        let Some(kind) = self.pending.pop_front() else {
            self.gate = None;
            return;
        };
        self.started += 1;
        trace!(?kind, serial = self.started, "notification");
        self.toasts.push(Toast {
            serial: self.started,
            kind,
            age: Duration::ZERO,
        });
        self.gate = Some(self.config.next_delay);
    }

    /// Advance toasts and the gate by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let lifetime = self.config.hold + self.config.fade;
        self.toasts.retain_mut(|t| {
            t.age += dt;
            t.age < lifetime
        });

        let mut left = dt;
        while let Some(gate) = self.gate {
            if gate > left {
                self.gate = Some(gate - left);
                break;
            }
            left -= gate;
            self.start_next();
            // Toasts started mid-tick already carry the surplus time.
            if let Some(t) = self.toasts.last_mut() {
                if self.gate.is_some() {
                    t.age = left;
                }
            }
        }
    }

    /// The message currently holding the gate, if any.
    pub fn active(&self) -> Option<MessageKind> {
        self.gate?;
        self.toasts.last().map(|t| t.kind)
    }

    pub fn pending(&self) -> impl Iterator<Item = MessageKind> + '_ {
        self.pending.iter().copied()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Visible toasts, oldest first.
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// Total number of messages started so far.
    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn is_idle(&self) -> bool {
        self.gate.is_none() && self.pending.is_empty()
    }
}

impl NotificationSink for RefCell<NotificationQueue> {
    fn show(&self, kind: MessageKind) {
        self.borrow_mut().push(kind);
    }
}

/// Collects messages in order; handy for headless runs and tests.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: RefCell<Vec<MessageKind>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<MessageKind> {
        self.messages.borrow().clone()
    }

    pub fn count(&self, kind: MessageKind) -> usize {
        self.messages.borrow().iter().filter(|k| **k == kind).count()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl NotificationSink for MessageLog {
    fn show(&self, kind: MessageKind) {
        self.messages.borrow_mut().push(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn queue() -> NotificationQueue {
        NotificationQueue::new(NotificationConfig::default())
    }

    #[test]
    fn first_message_starts_immediately() {
        let mut q = queue();
        q.push(MessageKind::PickUp);
        assert_eq!(q.active(), Some(MessageKind::PickUp));
        assert_eq!(q.toasts().len(), 1);
        assert_eq!(q.pending_len(), 0);
    }

    #[test]
    fn one_at_a_time_in_order() {
        let mut q = queue();
        q.push(MessageKind::PickUp);
        q.push(MessageKind::Put);
        q.push(MessageKind::Fall);
        assert_eq!(q.pending().collect::<Vec<_>>(), vec![MessageKind::Put, MessageKind::Fall]);

        q.tick(ms(499));
        assert_eq!(q.active(), Some(MessageKind::PickUp));
        q.tick(ms(1));
        assert_eq!(q.active(), Some(MessageKind::Put));
        q.tick(ms(500));
        assert_eq!(q.active(), Some(MessageKind::Fall));
        let kinds: Vec<_> = q.toasts().iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![MessageKind::PickUp, MessageKind::Put, MessageKind::Fall]);

        q.tick(ms(500));
        assert_eq!(q.active(), None);
        assert!(q.is_idle());
        assert_eq!(q.started(), 3);
    }

    #[test]
    fn big_tick_drains_several() {
        let mut q = queue();
        for kind in [MessageKind::Put, MessageKind::Threw, MessageKind::TooHigh] {
            q.push(kind);
        }
        q.tick(ms(1200));
        assert_eq!(q.active(), Some(MessageKind::TooHigh));
        let last = q.toasts().last().unwrap();
        assert_eq!(last.age, ms(200));
    }

    #[test]
    fn toasts_expire_after_hold_and_fade() {
        let mut q = queue();
        q.push(MessageKind::Disappeared);
        q.tick(ms(600));
        let t = &q.toasts()[0];
        assert!(t.fading(q.config()));
        assert!(t.rise(q.config()) > 0.5);
        q.tick(ms(900));
        assert!(q.toasts().is_empty());
    }

    #[test]
    fn idle_queue_restarts_on_push() {
        let mut q = queue();
        q.push(MessageKind::Put);
        q.tick(ms(600));
        assert_eq!(q.active(), None);
        q.push(MessageKind::Fall);
        assert_eq!(q.active(), Some(MessageKind::Fall));
    }

    #[test]
    fn sink_impls() {
        let q = RefCell::new(queue());
        q.show(MessageKind::Threw);
        assert_eq!(q.borrow().active(), Some(MessageKind::Threw));

        let log = MessageLog::new();
        log.show(MessageKind::Threw);
        log.show(MessageKind::Put);
        assert_eq!(log.count(MessageKind::Threw), 1);
        assert_eq!(log.messages(), vec![MessageKind::Threw, MessageKind::Put]);
    }
}

//! Key bindings and the pick-up/release dispatcher.

use crate::block::BlockId;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ScrollLeft,
    ScrollRight,
    Restart,
    Quit,
    None,
}

/// Map a key event to an action. Arrows and vim-style `h`/`l` both scroll.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::ScrollLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::ScrollRight,
        _ => Action::None,
    }
}

/// Pointer events the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PickUp(BlockId),
    Release(BlockId),
}

pub trait InputHandler {
    fn handle(self: Rc<Self>, event: InputEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fans pointer events out to subscribed handlers, in subscription order.
#[derive(Default)]
pub struct InputDispatcher {
    handlers: RefCell<Vec<(SubscriptionId, Rc<dyn InputHandler>)>>,
    next: Cell<u64>,
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Rc<dyn InputHandler>) -> SubscriptionId {
        self.next.set(self.next.get() + 1);
        let id = SubscriptionId(self.next.get());
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }

    pub fn subscribers(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn dispatch(&self, event: InputEvent) {
        // Handlers may subscribe or unsubscribe while handling.
        let handlers: Vec<_> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        trace!(?event, handlers = handlers.len(), "dispatch");
        for handler in handlers {
            handler.handle(event);
        }
    }
}

//! stacktui: drag blocks from a scrolling tray onto a tower, or into the hole.
//!
//! The core is the tower reflow engine ([`tower::TowerEngine`]): an ordered stack of
//! placed blocks with insertion at the top, removal anywhere, and cascade animations that
//! run strictly one after another. [`controller::GameController`] wires it to pointer
//! input, the tray and the notification queue. Everything runs on one thread inside a
//! tokio `LocalSet`; animations are awaited through [`anim::Completion`].

pub mod anim;
pub mod block;
pub mod classify;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod notify;
pub mod theme;
pub mod tower;
pub mod tray;

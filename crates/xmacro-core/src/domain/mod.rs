//! Domain model for xmacro.
//!
//! Pure data types and policy with no display-server dependencies, so
//! everything here can be compiled and tested on any platform.
//!
//! - [`event`] – the [`InputEvent`](event::InputEvent) union that flows
//!   between recorder, text stream, and player.
//! - [`session`] – the capture policy (stale releases, position gating,
//!   motion buffering, quit key) shared by both capture strategies.

pub mod event;
pub mod session;

//! Application layer use cases for the player.
//!
//! - **`replay`** – the [`ReplayDispatcher`](replay::ReplayDispatcher) that
//!   turns macro events into synthetic input.  The actual injection is done
//!   by a [`SyntheticInput`](replay::SyntheticInput) implementation injected
//!   at construction time.

pub mod replay;

//! Front-end adapters for funz-core.
//!
//! - **Panel**: a message-passing boundary for editor panels and other hosts.
//!   Hosts send [`PanelRequest`]s and render the [`PanelEvent`]s produced by a
//!   [`PanelController`]; nothing here depends on a rendering toolkit.
//! - **CLI**: table rendering for the `funz` binary (feature `cli`).

#[cfg(feature = "cli")]
pub mod cli;
pub mod controller;
pub mod messages;

pub use controller::{panel_variable_set, PanelController};
pub use messages::{NoticeLevel, PanelEvent, PanelRequest};

//! TUI 2048 (workspace facade crate).
//!
//! Re-exports the workspace crates as `tui_2048::{core,adapter,term,input,types}`
//! and hosts the pieces that only the binary needs: environment config and the
//! on-disk best-score store.

pub mod config;
pub mod store;

pub use tui_2048_adapter as adapter;
pub use tui_2048_core as core;
pub use tui_2048_input as input;
pub use tui_2048_term as term;
pub use tui_2048_types as types;

//! Pure domain logic for the refsync reconciliation core.
//!
//! Everything in this crate is deterministic over its inputs: no I/O,
//! no async, no hidden counters. The stateful layers in
//! `refsync-reconciler` stay thin by delegating all decisions here.

pub mod error;
pub mod estimation;
pub mod hydration;
pub mod merge;
pub mod pointer;
pub mod repair;
pub mod selection;
pub mod settings;
pub mod types;

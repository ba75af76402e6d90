//! Embeddable flowchart editor core.
//!
//! This crate provides the headless state layer of a flowchart diagram
//! editor: a normalized chart value (`model`), pure geometry helpers
//! (`geometry`), an action reducer with undo/redo history and pointer
//! gesture state machines (`editor`), and a per-instance publish/subscribe
//! channel (`bus`) for ephemeral gesture broadcasts.
//!
//! The binary `rustyflow` demonstrates usage: it loads a chart JSON file,
//! validates it and prints the normalized result.

pub mod bus;
pub mod geometry;
pub mod model;

pub mod editor;

//! # reclaim
//!
//! A local disk-cleanup engine.
//!
//! reclaim finds reclaimable files (caches, logs, browser data, build output,
//! trash, installed applications and their leftovers), classifies each one by
//! deletion risk, and removes what the caller selects:
//!
//! - **Pluggable scanners** run in parallel; one failing scanner never sinks a scan
//! - **Safety-first**: a protected deny-list and a live running-process check gate every deletion
//! - **App footprint**: related files are matched by bundle id before plain names
//! - **Preview before delete**, with succeeded/skipped/failed accounting
//! - **Append-only history** of every executed deletion

pub mod apps;
pub mod cleaner;
pub mod cli;
pub mod common;
pub mod engine;
pub mod scanner;

pub use engine::Engine;

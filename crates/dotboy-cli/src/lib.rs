//! Headless host for `dotboy-core`: loads a ROM from disk, keeps battery
//! saves, runs a number of frames and writes PNG captures.

pub mod args;
pub mod config;
pub mod persist;
pub mod session;
pub mod snapshot;

#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod data;
pub mod feed;
pub mod format;
pub mod logging;
pub mod router;
pub mod session;
pub mod storage;
pub mod ui;
pub mod video;
pub mod youtube;

#[cfg(test)]
mod testing;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;

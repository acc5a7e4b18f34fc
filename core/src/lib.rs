//! Cookie Tycoon core: the incremental-game economy and everything it
//! needs to run headless: catalog, engine, formatting, save/load and
//! the cooperative session driver.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod economy;
pub mod error;
pub mod event;
pub mod feedback;
pub mod format;
pub mod persistence;
pub mod session;
pub mod store;
pub mod types;

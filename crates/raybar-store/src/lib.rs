//! Raybar store — settings persistence.
//!
//! One JSON file under `~/.config/raybar/` serves two masters: the proxy
//! engine reads its `inbounds`/`outbounds`/`routing`/`dns`/`log` sections,
//! and this crate reads back the private `_raybar` section to restore the
//! application's settings. [`SettingsStore::save`] reports whether the file
//! changed so the engine supervisor knows when a restart is due.
//!
//! # Example
//!
//! ```no_run
//! use raybar_core::Settings;
//! use raybar_store::SettingsStore;
//!
//! let store = SettingsStore::new().unwrap();
//! let mut settings = store.load().unwrap();
//! settings.allow_lan = true;
//! let changed = store.save(&settings).unwrap();
//! assert!(changed);
//! ```

pub mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::SettingsStore;

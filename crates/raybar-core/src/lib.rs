//! Raybar core — data model, subscription-link parser, and engine-config
//! compiler.
//!
//! This crate is the pure heart of Raybar, a menu-bar front end for an
//! Xray-compatible proxy engine. It knows nothing about windows, processes,
//! or files: it models the user's settings, decodes proxy share links into
//! profiles, and compiles a settings snapshot into the JSON document the
//! engine is started with. Persistence lives in `raybar-store`; process
//! supervision and presentation live above that.
//!
//! # Example
//!
//! ```
//! use raybar_core::{compile, link, Settings};
//!
//! let mut settings = Settings::default();
//! let profile = link::parse("vless://1a2b3c@example.com:8443#MyServer").unwrap();
//! settings.select_profile(Some(profile.id));
//! settings.add_profile(profile);
//!
//! let document = compile(&settings);
//! assert!(document.as_value().get("outbounds").is_some());
//! ```

pub mod compiler;
pub mod dns;
pub mod link;
pub mod profile;
pub mod rule;
pub mod settings;
mod timestamp;

pub use compiler::{compile, ConfigDocument, SETTINGS_KEY};
pub use dns::{DnsPolicy, DnsServer};
pub use link::ParseError;
pub use profile::{Profile, Transport, TransportKind};
pub use rule::{Rule, RuleAction, RuleKind};
pub use settings::{ProxyMode, Settings, DEFAULT_HTTP_PORT, DEFAULT_SOCKS_PORT};

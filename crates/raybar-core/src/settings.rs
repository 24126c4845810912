//! The settings snapshot and its mutation API.
//!
//! [`Settings`] is a plain value: cloning it yields an independent snapshot,
//! which is what the compiler consumes. Mutations go through explicit
//! methods that each return a changed signal, so the caller that persists
//! and recompiles can do so exactly when something actually changed —
//! there are no side-effecting field setters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dns::{DnsPolicy, DnsServer};
use crate::profile::Profile;
use crate::rule::Rule;

/// Default SOCKS listener port.
pub const DEFAULT_SOCKS_PORT: u16 = 10808;
/// Default HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 10809;

/// How outbound traffic is routed overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProxyMode {
    /// Everything through the selected proxy.
    #[default]
    Global,
    /// Per-rule routing; first matching rule wins.
    Rule,
    /// Everything direct, proxy unused.
    Direct,
}

impl ProxyMode {
    /// Display name, as persisted in settings records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Global => "Global",
            ProxyMode::Rule => "Rule",
            ProxyMode::Direct => "Direct",
        }
    }
}

/// The full application settings state at a point in time.
///
/// Owns every profile, rule and DNS record. Collection order is insertion
/// order; for rules that order is semantically meaningful (it becomes
/// evaluation order in the compiled routing table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// SOCKS listener port.
    pub socks_port: u16,
    /// HTTP listener port.
    pub http_port: u16,
    /// Start the engine when the application launches.
    pub auto_connect: bool,
    /// Bind listeners on all interfaces instead of loopback.
    #[serde(rename = "allowLAN")]
    pub allow_lan: bool,
    /// Whether the OS system proxy is pointed at our listeners.
    pub system_proxy_enabled: bool,
    /// Whether the compiled config carries a `dns` section.
    pub dns_server_enabled: bool,
    /// Overall routing mode.
    pub proxy_mode: ProxyMode,
    /// Id of the currently selected profile, if any.
    #[serde(rename = "selectedConfigId", skip_serializing_if = "Option::is_none")]
    pub selected_profile: Option<Uuid>,
    /// Outbound server profiles.
    #[serde(rename = "configs")]
    pub profiles: Vec<Profile>,
    /// Routing rules, in evaluation order.
    pub rules: Vec<Rule>,
    /// DNS servers, in order.
    pub dns_servers: Vec<DnsServer>,
    /// Per-domain DNS policies, in order.
    pub dns_policies: Vec<DnsPolicy>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socks_port: DEFAULT_SOCKS_PORT,
            http_port: DEFAULT_HTTP_PORT,
            auto_connect: false,
            allow_lan: false,
            system_proxy_enabled: false,
            dns_server_enabled: false,
            proxy_mode: ProxyMode::Global,
            selected_profile: None,
            profiles: Vec::new(),
            rules: Vec::new(),
            dns_servers: Vec::new(),
            dns_policies: Vec::new(),
        }
    }
}

impl Settings {
    /// Looks up a profile by id.
    pub fn profile(&self, id: Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// The currently selected profile, if one is selected and still exists.
    pub fn selected(&self) -> Option<&Profile> {
        self.selected_profile.and_then(|id| self.profile(id))
    }

    /// Selects a profile (or clears the selection). Returns whether the
    /// selection changed.
    pub fn select_profile(&mut self, id: Option<Uuid>) -> bool {
        if self.selected_profile == id {
            return false;
        }
        self.selected_profile = id;
        true
    }

    // === Profiles ===

    /// Appends a profile.
    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.push(profile);
    }

    /// Replaces the profile with the same id. Returns whether a record was
    /// replaced; partial in-place edits are deliberately not offered.
    pub fn update_profile(&mut self, profile: Profile) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(slot) => {
                *slot = profile;
                true
            }
            None => false,
        }
    }

    /// Removes a profile by id, clearing the selection if it pointed at the
    /// removed record. Returns whether a record existed.
    pub fn delete_profile(&mut self, id: Uuid) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        let removed = self.profiles.len() != before;
        if removed && self.selected_profile == Some(id) {
            self.selected_profile = None;
        }
        removed
    }

    // === Rules ===

    /// Appends a rule at the end of the evaluation order.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Replaces the rule with the same id, keeping its position.
    pub fn update_rule(&mut self, rule: Rule) -> bool {
        match self.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(slot) => {
                *slot = rule;
                true
            }
            None => false,
        }
    }

    /// Removes a rule by id.
    pub fn delete_rule(&mut self, id: Uuid) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    /// Removes all rules.
    pub fn clear_rules(&mut self) -> bool {
        let had_any = !self.rules.is_empty();
        self.rules.clear();
        had_any
    }

    // === DNS ===

    /// Appends a DNS server.
    pub fn add_dns_server(&mut self, server: DnsServer) {
        self.dns_servers.push(server);
    }

    /// Replaces the DNS server with the same id.
    pub fn update_dns_server(&mut self, server: DnsServer) -> bool {
        match self.dns_servers.iter_mut().find(|s| s.id == server.id) {
            Some(slot) => {
                *slot = server;
                true
            }
            None => false,
        }
    }

    /// Removes a DNS server by id.
    pub fn delete_dns_server(&mut self, id: Uuid) -> bool {
        let before = self.dns_servers.len();
        self.dns_servers.retain(|s| s.id != id);
        self.dns_servers.len() != before
    }

    /// Appends a DNS policy.
    pub fn add_dns_policy(&mut self, policy: DnsPolicy) {
        self.dns_policies.push(policy);
    }

    /// Replaces the DNS policy with the same id.
    pub fn update_dns_policy(&mut self, policy: DnsPolicy) -> bool {
        match self.dns_policies.iter_mut().find(|p| p.id == policy.id) {
            Some(slot) => {
                *slot = policy;
                true
            }
            None => false,
        }
    }

    /// Removes a DNS policy by id.
    pub fn delete_dns_policy(&mut self, id: Uuid) -> bool {
        let before = self.dns_policies.len();
        self.dns_policies.retain(|p| p.id != id);
        self.dns_policies.len() != before
    }

    /// Removes all DNS servers and policies.
    pub fn clear_dns(&mut self) -> bool {
        let had_any = !self.dns_servers.is_empty() || !self.dns_policies.is_empty();
        self.dns_servers.clear();
        self.dns_policies.clear();
        had_any
    }
}

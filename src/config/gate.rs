// src/config/gate.rs
//! Config gate: refuses to route a request to an upstream whose credentials
//! or endpoint are not configured. Snapshot taken once from `AppConfig`.

use std::collections::HashMap;

use super::{AppConfig, Upstream, UpstreamCredential};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Unready(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct ConfigGate {
    credentials: HashMap<Upstream, UpstreamCredential>,
}

impl ConfigGate {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let credentials = Upstream::ALL
            .into_iter()
            .map(|u| (u, cfg.credential(u)))
            .collect();
        Self { credentials }
    }

    /// Pure lookup; no I/O.
    pub fn check(&self, upstream: Upstream) -> Readiness {
        match self.credentials.get(&upstream) {
            Some(cred) if cred.present() => Readiness::Ready,
            Some(cred) => Readiness::Unready(cred.missing.iter().copied().collect()),
            None => Readiness::Unready(Vec::new()),
        }
    }
}

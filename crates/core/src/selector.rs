use crate::{
    error::Result,
    model::{ByteCounters, NetworkScope},
    source::NetworkSource,
};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// The user's interface choice; `None` aggregates every interface
#[derive(Debug, Default)]
pub struct InterfaceSelector {
    selected: RwLock<Option<String>>,
    loopback_prefix: String,
}

impl InterfaceSelector {
    pub fn new(initial: Option<String>, loopback_prefix: impl Into<String>) -> Self {
        Self {
            selected: RwLock::new(initial),
            loopback_prefix: loopback_prefix.into(),
        }
    }

    pub fn select(&self, interface: Option<String>) {
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = interface;
    }

    pub fn selected(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pick the counters to diff this cycle.
    ///
    /// A selected interface missing from `per_interface` falls back to the
    /// aggregate of all interfaces.
    pub fn resolve(
        &self,
        per_interface: &BTreeMap<String, ByteCounters>,
    ) -> (NetworkScope, ByteCounters) {
        if let Some(name) = self.selected() {
            if let Some(counters) = per_interface.get(&name) {
                return (NetworkScope::Interface(name), *counters);
            }
        }

        (NetworkScope::AllInterfaces, ByteCounters::sum(per_interface.values()))
    }

    pub fn is_loopback(&self, name: &str) -> bool {
        !self.loopback_prefix.is_empty() && name.starts_with(&self.loopback_prefix)
    }

    /// Drop loopback names, keeping the order of `names`
    pub fn selectable(&self, names: impl IntoIterator<Item = String>) -> Vec<String> {
        names.into_iter().filter(|name| !self.is_loopback(name)).collect()
    }

    /// Selectable interface names, loopback excluded, in name order
    pub fn available(&self, source: &dyn NetworkSource) -> Result<Vec<String>> {
        Ok(self.selectable(source.interface_counters()?.into_keys()))
    }
}

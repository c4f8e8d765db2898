//! Host methods keyed by signature

use crate::host::HostType;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Map from host-level method signature to method handle
#[derive(Debug, Clone)]
pub struct SignatureIndex<M> {
    methods: FxHashMap<String, M>,
}

impl<M: Clone> SignatureIndex<M> {
    /// Enumerate the methods of `host` and key them by descriptor
    ///
    /// On a descriptor collision the earliest method is kept.
    pub fn build<H: HostType<Method = M>>(host: &H) -> Self {
        let mut methods = FxHashMap::default();
        for method in host.methods() {
            match methods.entry(host.method_descriptor(&method)) {
                Entry::Vacant(slot) => {
                    slot.insert(method);
                }
                Entry::Occupied(slot) => {
                    tracing::warn!(
                        host = %host.name(),
                        signature = slot.key().as_str(),
                        "duplicate method descriptor from host, keeping the first"
                    );
                }
            }
        }
        tracing::debug!(host = %host.name(), methods = methods.len(), "built signature index");
        Self { methods }
    }

    /// Look up a method by signature
    pub fn get(&self, signature: &str) -> Option<&M> {
        self.methods.get(signature)
    }

    /// Number of indexed methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

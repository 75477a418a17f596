//! Definition registry
//!
//! The only state shared between concurrent resolutions. Each definition id
//! is absent, being built, or built; the claim step below is the single
//! critical section and never spans a build.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::resolver::walk::Walk;
use crate::types::{Definitions, Schema};

#[derive(Debug)]
enum Slot {
    /// Claimed by `builders` in-flight builds
    Building { builders: usize },
    Built(Arc<Schema>),
}

/// Outcome of claiming an id
#[derive(Debug)]
pub(crate) enum Claim {
    /// Already built; use this node
    Built(Arc<Schema>),
    /// The id is being built further up the caller's own chain
    Cycle,
    /// The caller should build the node and then `complete` or `abandon`
    Claimed,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    slots: Mutex<HashMap<String, Slot>>,
}

impl Registry {
    /// Check-and-reserve. Another thread building the same id does not
    /// block the caller: both build, and the first to finish is kept.
    pub fn claim(&self, id: &str, walk: &Walk) -> Claim {
        let mut slots = self.slots.lock();
        match slots.get_mut(id) {
            Some(Slot::Built(node)) => Claim::Built(Arc::clone(node)),
            _ if walk.contains(id) => Claim::Cycle,
            Some(Slot::Building { builders }) => {
                *builders += 1;
                debug!("{} already being built elsewhere, building redundantly", id);
                Claim::Claimed
            }
            None => {
                slots.insert(id.to_string(), Slot::Building { builders: 1 });
                Claim::Claimed
            }
        }
    }

    /// Publish a finished node. If a racing build published first, its node
    /// is returned instead and `node` is dropped.
    ///
    /// Deliberately first finisher wins rather than last write wins, so every
    /// caller holds the same `Arc` for an id.
    pub fn complete(&self, id: &str, node: Arc<Schema>) -> Arc<Schema> {
        let mut slots = self.slots.lock();
        if let Some(Slot::Built(existing)) = slots.get(id) {
            return Arc::clone(existing);
        }
        slots.insert(id.to_string(), Slot::Built(Arc::clone(&node)));
        node
    }

    /// Withdraw a claim after a failed build so a retry starts clean.
    pub fn abandon(&self, id: &str) {
        let mut slots = self.slots.lock();
        if let Some(Slot::Building { builders }) = slots.get_mut(id) {
            *builders -= 1;
            if *builders == 0 {
                slots.remove(id);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Schema>> {
        match self.slots.lock().get(id) {
            Some(Slot::Built(node)) => Some(Arc::clone(node)),
            _ => None,
        }
    }

    /// Whether any slot (built or not) exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.slots.lock().contains_key(id)
    }

    /// Snapshot of every built definition
    pub fn definitions(&self) -> Definitions {
        self.slots
            .lock()
            .iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Built(node) => Some((id.clone(), (**node).clone())),
                Slot::Building { .. } => None,
            })
            .collect()
    }

    pub fn reset(&self) {
        self.slots.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaKind;

    fn node(kind: SchemaKind) -> Arc<Schema> {
        Arc::new(Schema::default().typed(kind, None))
    }

    #[test]
    fn test_claim_lifecycle() {
        let registry = Registry::default();
        let mut walk = Walk::default();

        assert!(matches!(registry.claim("p.A", &walk), Claim::Claimed));
        walk.push("p.A");
        assert!(matches!(registry.claim("p.A", &walk), Claim::Cycle));
        assert!(registry.definitions().is_empty());

        let built = registry.complete("p.A", node(SchemaKind::Object));
        walk.pop();
        match registry.claim("p.A", &walk) {
            Claim::Built(n) => assert!(Arc::ptr_eq(&n, &built)),
            other => panic!("unexpected claim {:?}", other),
        }
        assert_eq!(registry.definitions().len(), 1);
    }

    #[test]
    fn test_first_finisher_wins() {
        let registry = Registry::default();
        let walk = Walk::default();
        assert!(matches!(registry.claim("p.A", &walk), Claim::Claimed));
        // a second call chain races on the same id
        assert!(matches!(registry.claim("p.A", &walk), Claim::Claimed));

        let first = registry.complete("p.A", node(SchemaKind::Object));
        let second = registry.complete("p.A", node(SchemaKind::String));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.kind, Some(SchemaKind::Object));
    }

    #[test]
    fn test_abandon_removes_placeholder() {
        let registry = Registry::default();
        let walk = Walk::default();
        assert!(matches!(registry.claim("p.Bad", &walk), Claim::Claimed));
        assert!(matches!(registry.claim("p.Bad", &walk), Claim::Claimed));

        registry.abandon("p.Bad");
        assert!(registry.contains("p.Bad"));
        registry.abandon("p.Bad");
        assert!(!registry.contains("p.Bad"));
        assert!(matches!(registry.claim("p.Bad", &walk), Claim::Claimed));
    }
}

//! Per-call-chain build state
//!
//! A [`Walk`] is the stack of definitions one resolution is building. A node
//! that refers back to a frame still on the stack is only valid once that
//! frame completes, so it is held here instead of being published. Held
//! nodes are published together with the frame they depend on, or dropped
//! with it when that build fails.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Schema;

#[derive(Debug, Default)]
struct Frame {
    id: String,
    /// Lowest stack index the subtree of this frame refers back to
    low: usize,
    /// Referred back to from inside its own build
    recursive: bool,
    /// Held nodes waiting on this frame
    dependents: Vec<String>,
}

/// A frame taken off the walk
#[derive(Debug)]
pub(crate) struct Popped {
    pub id: String,
    /// Unfinished frame the node still depends on
    pub anchor: Option<usize>,
    pub recursive: bool,
    pub dependents: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Walk {
    frames: Vec<Frame>,
    held: HashMap<String, (Arc<Schema>, usize)>,
}

impl Walk {
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.frames.iter().rposition(|f| f.id == id)
    }

    pub fn push(&mut self, id: &str) {
        let low = self.frames.len();
        self.frames.push(Frame {
            id: id.to_string(),
            low,
            ..Frame::default()
        });
    }

    pub fn pop(&mut self) -> Popped {
        // an unbalanced pop yields an empty frame
        let frame = self.frames.pop().unwrap_or_default();
        let index = self.frames.len();
        self.depend_on(frame.low);
        Popped {
            id: frame.id,
            anchor: (frame.low < index).then_some(frame.low),
            recursive: frame.recursive,
            dependents: frame.dependents,
        }
    }

    /// Record a reference from the top frame back to `id`.
    pub fn refer_back(&mut self, id: &str) {
        if let Some(pos) = self.position(id) {
            self.frames[pos].recursive = true;
            self.depend_on(pos);
        }
    }

    fn depend_on(&mut self, pos: usize) {
        if let Some(top) = self.frames.last_mut() {
            top.low = top.low.min(pos);
        }
    }

    /// A node finished on this walk but not yet published
    pub fn held(&mut self, id: &str) -> Option<Arc<Schema>> {
        let (node, anchor) = self.held.get(id).map(|(n, a)| (Arc::clone(n), *a))?;
        self.depend_on(anchor);
        Some(node)
    }

    pub fn is_held(&self, id: &str) -> bool {
        self.held.contains_key(id)
    }

    /// Park `node` and the nodes already waiting on it until frame `anchor`
    /// completes.
    pub fn defer(&mut self, anchor: usize, id: &str, node: Option<Arc<Schema>>, dependents: Vec<String>) {
        for dep in &dependents {
            if let Some(entry) = self.held.get_mut(dep) {
                entry.1 = anchor;
            }
        }
        let Some(frame) = self.frames.get_mut(anchor) else {
            return;
        };
        frame.dependents.extend(dependents);
        if let Some(node) = node {
            frame.dependents.push(id.to_string());
            self.held.insert(id.to_string(), (node, anchor));
        }
    }

    pub fn release(&mut self, id: &str) -> Option<Arc<Schema>> {
        self.held.remove(id).map(|(node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_reference_anchors_frames_above() {
        let mut walk = Walk::default();
        walk.push("p.A");
        walk.push("p.B");
        walk.push("p.C");
        walk.refer_back("p.A");

        let c = walk.pop();
        assert_eq!(c.anchor, Some(0));
        assert!(!c.recursive);
        walk.defer(0, &c.id, Some(Arc::new(Schema::default())), c.dependents);

        // B contains C, so it waits on A as well
        let b = walk.pop();
        assert_eq!(b.anchor, Some(0));
        walk.defer(0, &b.id, Some(Arc::new(Schema::default())), b.dependents);
        assert!(walk.held("p.C").is_some());

        let a = walk.pop();
        assert_eq!(a.anchor, None);
        assert!(a.recursive);
        assert_eq!(a.dependents, vec!["p.C", "p.B"]);
        assert!(walk.release("p.B").is_some());
        assert!(walk.release("p.B").is_none());
    }

    #[test]
    fn test_self_reference_needs_no_anchor() {
        let mut walk = Walk::default();
        walk.push("p.A");
        walk.push("p.List");
        walk.refer_back("p.List");
        let list = walk.pop();
        assert!(list.recursive);
        assert_eq!(list.anchor, None);
        assert!(!walk.contains("p.List"));
        assert!(walk.contains("p.A"));
    }
}

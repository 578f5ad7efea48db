//! # Tree walks: descent, materialization, lineage, descendant sweeps.
//!
//! The store owns the root node and implements every traversal the broker
//! needs. Descent exploits an invariant of materialization: intermediate
//! nodes are always created one generation at a time, so a node's children
//! are exactly one generation deeper. Each step therefore computes the
//! target's next generation-prefix and binary-searches the sorted children
//! for that exact key — immune to siblings that sort between a parent
//! prefix and the target (`"a.b-x"` sits between `"a.b"` and `"a.b.c"` in
//! byte order).

use crate::topic::{prefixes, Topic};

use super::node::Node;

/// Root-owning topic tree.
pub(crate) struct Store<M, R> {
    root: Node<M, R>,
}

impl<M, R> Store<M, R> {
    pub(crate) fn new() -> Self {
        Store {
            root: Node::new(Topic::root()),
        }
    }

    /// The deepest existing node whose topic is `topic` itself or an
    /// ancestor of it. At worst this is the root.
    pub(crate) fn ancestor(&self, topic: &str) -> &Node<M, R> {
        let mut node = &self.root;
        for prefix in prefixes(topic) {
            match node.child(prefix) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// Mutable variant of [`Store::ancestor`].
    pub(crate) fn ancestor_mut(&mut self, topic: &str) -> &mut Node<M, R> {
        let mut node = &mut self.root;
        for prefix in prefixes(topic) {
            match node.child_index(prefix) {
                Ok(i) => node = &mut node.children[i],
                Err(_) => break,
            }
        }
        node
    }

    /// The node with exactly this topic, if materialized.
    pub(crate) fn exact(&self, topic: &str) -> Option<&Node<M, R>> {
        let node = self.ancestor(topic);
        (node.topic == *topic).then_some(node)
    }

    /// Mutable variant of [`Store::exact`].
    pub(crate) fn exact_mut(&mut self, topic: &str) -> Option<&mut Node<M, R>> {
        let node = self.ancestor_mut(topic);
        (node.topic == *topic).then_some(node)
    }

    /// Returns the node for `topic`, materializing it and every missing
    /// intermediate generation. Idempotent.
    pub(crate) fn materialize(&mut self, topic: &Topic) -> &mut Node<M, R> {
        let mut node = &mut self.root;
        for prefix in prefixes(topic) {
            let i = match node.child_index(prefix) {
                Ok(i) => i,
                Err(i) => {
                    node.children.insert(i, Node::new(Topic::from(prefix)));
                    i
                }
            };
            node = &mut node.children[i];
        }
        node
    }

    /// Existing nodes from the root down to the deepest ancestor of
    /// `topic`, inclusive. The last element may be `topic` itself or a
    /// proper ancestor.
    pub(crate) fn lineage(&self, topic: &str) -> Vec<&Node<M, R>> {
        let mut line = vec![&self.root];
        let mut node = &self.root;
        for prefix in prefixes(topic) {
            match node.child(prefix) {
                Some(child) => {
                    node = child;
                    line.push(child);
                }
                None => break,
            }
        }
        line
    }

    /// `node` followed by all transitive descendants, pre-order (children
    /// in sorted topic order).
    pub(crate) fn descendants<'a>(node: &'a Node<M, R>) -> Vec<&'a Node<M, R>> {
        let mut out = Vec::new();
        fn walk<'a, M, R>(node: &'a Node<M, R>, out: &mut Vec<&'a Node<M, R>>) {
            out.push(node);
            for child in &node.children {
                walk(child, out);
            }
        }
        walk(node, &mut out);
        out
    }

    /// Applies `f` to the topic node and every descendant; returns the
    /// summed result, or `None` when the topic is not materialized.
    pub(crate) fn sweep<F>(&mut self, topic: &str, mut f: F) -> Option<usize>
    where
        F: FnMut(&mut Node<M, R>) -> usize,
    {
        fn walk<M, R, F>(node: &mut Node<M, R>, f: &mut F) -> usize
        where
            F: FnMut(&mut Node<M, R>) -> usize,
        {
            let mut n = f(node);
            for child in &mut node.children {
                n += walk(child, f);
            }
            n
        }
        let node = self.exact_mut(topic)?;
        Some(walk(node, &mut f))
    }

    /// Applies `f` to every node in the tree; returns the summed result.
    pub(crate) fn sweep_all<F>(&mut self, f: F) -> usize
    where
        F: FnMut(&mut Node<M, R>) -> usize,
    {
        self.sweep("", f).unwrap_or(0)
    }
}

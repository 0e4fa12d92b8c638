//! Index-addressed storage for the blocks the assembler is building.
//!
//! Open containers are referenced by [`NodeId`]; children are attached by
//! index and the finished tree is materialised in one pass once its root
//! closes.
use crate::model::{BlockContent, DelimitedBlock, Element, ListItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug)]
pub(crate) enum Node {
    Element(Element),
    Item(ListItem),
}

#[derive(Debug)]
struct Slot {
    node: Node,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Slot>>,
}

impl Arena {
    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.slots.push(Some(Slot {
            node,
            children: Vec::new(),
        }));
        NodeId(self.slots.len() - 1)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(Some(slot)) = self.slots.get_mut(parent.0) {
            slot.children.push(child);
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0)?.as_ref().map(|slot| &slot.node)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0)?.as_mut().map(|slot| &mut slot.node)
    }

    /// Detach trailing children for which `predicate` holds.
    pub(crate) fn trim_trailing_children(&mut self, id: NodeId, predicate: impl Fn(&Node) -> bool) {
        loop {
            let Some(Some(slot)) = self.slots.get(id.0) else {
                return;
            };
            let Some(&last) = slot.children.last() else {
                return;
            };
            if !self.node(last).is_some_and(&predicate) {
                return;
            }
            if let Some(Some(slot)) = self.slots.get_mut(id.0) {
                slot.children.pop();
            }
        }
    }

    /// Take the node out of the arena with all of its descendants folded in.
    pub(crate) fn build(&mut self, id: NodeId) -> Option<Node> {
        let Slot { mut node, children } = self.slots.get_mut(id.0)?.take()?;
        for child in children {
            let Some(child) = self.build(child) else {
                continue;
            };
            match (&mut node, child) {
                (
                    Node::Element(Element::DelimitedBlock(DelimitedBlock {
                        content: BlockContent::Compound { children },
                        ..
                    })),
                    Node::Element(element),
                ) => children.push(element),
                (Node::Element(Element::List(list) | Element::LabeledList(list)), Node::Item(item)) => {
                    list.items.push(item);
                }
                (Node::Item(item), Node::Element(element)) => item.children.push(element),
                (parent, child) => {
                    tracing::error!(?parent, ?child, "child attached to a node that cannot hold it, dropping");
                }
            }
        }
        Some(node)
    }

    /// Forget every node. Called once the open tree has been built.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

//! Component tree builder.
//!
//! Turns the flat, reference-based page graph into a tree of entities,
//! building bottom-up so every child exists before its parent:
//!
//! ```text
//!   root ──▸ traversal (each node once, leaves first) ──▸ fold ──▸ root entity
//!                                                          │
//!                                                   cache by pointer
//! ```
//!
//! A node reachable through several parents is built once, and each parent
//! holds the same `Arc`. Dangling child references are skipped.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::component::{Component, ComponentFactory};
use crate::error::ModelError;
use crate::meta::MetaFactory;
use crate::model::{child_references, PageModel};
use crate::reference::{resolve, Reference};

pub struct TreeBuilder<'a> {
    components: &'a ComponentFactory,
    meta: &'a MetaFactory,
}

enum Visit {
    Enter(Reference),
    Exit(Reference),
}

impl<'a> TreeBuilder<'a> {
    pub fn new(components: &'a ComponentFactory, meta: &'a MetaFactory) -> Self {
        Self { components, meta }
    }

    /// Build the entity tree rooted at `model.root`.
    pub fn build(&self, model: &PageModel) -> Result<Arc<Component>, ModelError> {
        let order = traverse(model, &model.root)?;
        let mut built: FxHashMap<String, Arc<Component>> =
            FxHashMap::with_capacity_and_hasher(order.len(), Default::default());

        for reference in order {
            let Some(node) = resolve(model, &reference) else {
                continue;
            };
            let mut children = Vec::new();
            for child in child_references(node) {
                if resolve(model, &child).is_none() {
                    continue;
                }
                let entity = built
                    .get(&child.pointer)
                    .cloned()
                    .ok_or_else(|| ModelError::CyclicReference(child.pointer.clone()))?;
                children.push(entity);
            }
            let entity = self.components.create(node, children, self.meta)?;
            built.insert(reference.pointer, entity);
        }

        built
            .remove(&model.root.pointer)
            .ok_or_else(|| ModelError::MissingRoot(model.root.pointer.clone()))
    }
}

/// Every node reachable from `root`, once, each after all of its children.
///
/// Iterative depth-first post-order. A reference back to a node whose subtree
/// is still being visited is a cycle.
pub fn traverse(model: &PageModel, root: &Reference) -> Result<Vec<Reference>, ModelError> {
    let mut order = Vec::new();
    let mut done: FxHashSet<String> = FxHashSet::default();
    let mut active: FxHashSet<String> = FxHashSet::default();
    let mut stack = vec![Visit::Enter(root.clone())];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(reference) => {
                if done.contains(&reference.pointer) {
                    continue;
                }
                if active.contains(&reference.pointer) {
                    return Err(ModelError::CyclicReference(reference.pointer));
                }
                let Some(node) = resolve(model, &reference) else {
                    continue;
                };

                active.insert(reference.pointer.clone());
                let children = child_references(node);
                stack.push(Visit::Exit(reference));
                stack.extend(children.into_iter().rev().map(Visit::Enter));
            }
            Visit::Exit(reference) => {
                active.remove(&reference.pointer);
                done.insert(reference.pointer.clone());
                order.push(reference);
            }
        }
    }

    Ok(order)
}

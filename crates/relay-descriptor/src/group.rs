use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::{DescriptorError, Result};
use crate::target::Target;

/// How a group orders its children for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Construction order, identical on every call
    #[default]
    Ordered,
    /// A fresh uniform shuffle of the children on every call
    Random,
    /// Round-robin: each call starts one child further along
    LoadBalanced,
}

/// Composite descriptor: an ordered collection of child descriptors under a
/// selection policy.
///
/// The children never change after construction. The only mutable state is
/// the rotation cursor used by [`SelectionPolicy::LoadBalanced`], which is a
/// single atomic so concurrent calls never need a lock.
#[derive(Debug)]
pub struct Group {
    children: Vec<Descriptor>,
    policy: SelectionPolicy,
    leaf_count: usize,
    first_target: Target,
    cursor: AtomicUsize,
}

impl Group {
    /// Creates a group.
    ///
    /// # Errors
    ///
    /// - [`DescriptorError::EmptyGroup`] if `children` is empty
    /// - [`DescriptorError::DuplicateTarget`] if two direct target children
    ///   share an address
    pub fn new(policy: SelectionPolicy, children: Vec<Descriptor>) -> Result<Self> {
        let Some(first) = children.first() else {
            return Err(DescriptorError::EmptyGroup);
        };
        let first_target = first.first_target().clone();

        {
            let mut seen = HashSet::new();
            for child in &children {
                if let Descriptor::Target(target) = child {
                    if !seen.insert(target.address()) {
                        return Err(DescriptorError::DuplicateTarget {
                            address: target.address().to_string(),
                        });
                    }
                }
            }
        }

        let leaf_count = children.iter().map(Descriptor::leaf_count).sum();

        Ok(Self {
            children,
            policy,
            leaf_count,
            first_target,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn ordered(children: Vec<Descriptor>) -> Result<Self> {
        Self::new(SelectionPolicy::Ordered, children)
    }

    pub fn random(children: Vec<Descriptor>) -> Result<Self> {
        Self::new(SelectionPolicy::Random, children)
    }

    pub fn load_balanced(children: Vec<Descriptor>) -> Result<Self> {
        Self::new(SelectionPolicy::LoadBalanced, children)
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// First target in construction order.
    pub fn first_target(&self) -> &Target {
        &self.first_target
    }

    /// Appends this group's leaves in policy order.
    pub(crate) fn collect_leaves(&self, out: &mut Vec<Target>) {
        for index in self.child_order() {
            self.children[index].collect_leaves(out);
        }
    }

    /// Appends this group's leaves in construction order, leaving the cursor alone.
    pub(crate) fn collect_canonical_leaves(&self, out: &mut Vec<Target>) {
        for child in &self.children {
            child.collect_canonical_leaves(out);
        }
    }

    fn child_order(&self) -> Vec<usize> {
        let n = self.children.len();
        match self.policy {
            SelectionPolicy::Ordered => (0..n).collect(),
            SelectionPolicy::Random => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rand::thread_rng());
                order
            }
            SelectionPolicy::LoadBalanced => {
                let start = self.advance_cursor();
                (start..n).chain(0..start).collect()
            }
        }
    }

    /// Atomically returns the current cursor and moves it one child forward,
    /// wrapping at the child count.
    fn advance_cursor(&self) -> usize {
        let n = self.children.len();
        // The closure always returns Some, so both arms carry the previous value
        match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % n))
        {
            Ok(prev) | Err(prev) => prev,
        }
    }

    /// Current rotation position (diagnostics only).
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

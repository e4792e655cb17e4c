use crate::config::DescriptorConfig;
use crate::error::Result;
use crate::group::{Group, SelectionPolicy};
use crate::target::Target;

/// A node in the endpoint tree: either one callable [`Target`] or a [`Group`]
/// of further descriptors.
///
/// Every descriptor contains at least one target, since groups cannot be
/// empty. Descriptors are built once and shared read-only (typically behind
/// an `Arc`); the only state that changes afterwards is the rotation cursor
/// of load-balanced groups.
///
/// # Example
///
/// ```
/// use relay_descriptor::{Descriptor, Group, Target};
///
/// let descriptor = Descriptor::from(
///     Group::ordered(vec![
///         Target::new("10.0.0.1:9001").unwrap().into(),
///         Target::new("10.0.0.2:9001").unwrap().into(),
///     ])
///     .unwrap(),
/// );
///
/// assert!(descriptor.is_group());
/// assert_eq!(descriptor.leaf_count(), 2);
/// assert_eq!(descriptor.leaves()[0].address(), "10.0.0.1:9001");
/// ```
#[derive(Debug)]
pub enum Descriptor {
    Target(Target),
    Group(Group),
}

impl Descriptor {
    /// Builds a descriptor tree from parsed configuration.
    pub fn from_config(config: &DescriptorConfig) -> Result<Self> {
        config.build()
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Descriptor::Group(_))
    }

    /// Total number of targets reachable from this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Descriptor::Target(_) => 1,
            Descriptor::Group(group) => group.leaf_count(),
        }
    }

    /// First target in construction order. Never advances any cursor.
    pub fn first_target(&self) -> &Target {
        match self {
            Descriptor::Target(target) => target,
            Descriptor::Group(group) => group.first_target(),
        }
    }

    /// The selection policy of a group, `None` for a single target.
    pub fn policy(&self) -> Option<SelectionPolicy> {
        match self {
            Descriptor::Target(_) => None,
            Descriptor::Group(group) => Some(group.policy()),
        }
    }

    /// Candidate sequence for one logical call.
    ///
    /// Every target appears exactly once, ordered by each group's selection
    /// policy. Random groups are reshuffled and load-balanced groups advance
    /// their cursor by one on every invocation, so call this once per logical
    /// call and walk the returned list.
    pub fn leaves(&self) -> Vec<Target> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    /// All targets in construction order. Never advances any cursor.
    pub fn canonical_leaves(&self) -> Vec<Target> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_canonical_leaves(&mut out);
        out
    }

    /// Depth-first search, in construction order, for the first target with
    /// the given checksum.
    ///
    /// Returns `None` when no target matches; this is an expected outcome.
    pub fn find_by_checksum(&self, checksum: u32) -> Option<&Target> {
        match self {
            Descriptor::Target(target) => (target.checksum() == checksum).then_some(target),
            Descriptor::Group(group) => group
                .children()
                .iter()
                .find_map(|child| child.find_by_checksum(checksum)),
        }
    }

    pub(crate) fn collect_leaves(&self, out: &mut Vec<Target>) {
        match self {
            Descriptor::Target(target) => out.push(target.clone()),
            Descriptor::Group(group) => group.collect_leaves(out),
        }
    }

    pub(crate) fn collect_canonical_leaves(&self, out: &mut Vec<Target>) {
        match self {
            Descriptor::Target(target) => out.push(target.clone()),
            Descriptor::Group(group) => group.collect_canonical_leaves(out),
        }
    }
}

impl From<Target> for Descriptor {
    fn from(target: Target) -> Self {
        Descriptor::Target(target)
    }
}

impl From<Group> for Descriptor {
    fn from(group: Group) -> Self {
        Descriptor::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use std::collections::HashSet;

    fn target(addr: &str) -> Descriptor {
        Target::new(addr).unwrap().into()
    }

    fn addresses(leaves: &[Target]) -> Vec<String> {
        leaves.iter().map(|t| t.address().to_string()).collect()
    }

    #[test]
    fn test_single_target() {
        let descriptor = target("localhost:9001");
        assert!(!descriptor.is_group());
        assert_eq!(descriptor.leaf_count(), 1);
        assert_eq!(addresses(&descriptor.leaves()), vec!["localhost:9001"]);
        assert!(descriptor.policy().is_none());
    }

    #[test]
    fn test_first_target_is_construction_order() {
        let inner = Group::random(vec![target("b:1"), target("c:1")]).unwrap();
        let descriptor: Descriptor =
            Group::load_balanced(vec![inner.into(), target("a:1")])
                .unwrap()
                .into();

        descriptor.leaves();
        descriptor.leaves();
        assert_eq!(descriptor.first_target().address(), "b:1");
        assert_eq!(descriptor.first_target(), &descriptor.canonical_leaves()[0]);
        assert_eq!(target("z:9").first_target().address(), "z:9");
    }

    #[test]
    fn test_ordered_leaves_repeatable() {
        let descriptor: Descriptor =
            Group::ordered(vec![target("a:1"), target("b:1"), target("c:1")])
                .unwrap()
                .into();
        let first = descriptor.leaves();
        let second = descriptor.leaves();
        assert_eq!(addresses(&first), vec!["a:1", "b:1", "c:1"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_groups_concatenate() {
        let inner = Group::ordered(vec![target("b:1"), target("c:1")]).unwrap();
        let descriptor: Descriptor =
            Group::ordered(vec![target("a:1"), inner.into(), target("d:1")])
                .unwrap()
                .into();
        assert_eq!(descriptor.leaf_count(), 4);
        assert_eq!(
            addresses(&descriptor.leaves()),
            vec!["a:1", "b:1", "c:1", "d:1"]
        );
    }

    #[test]
    fn test_random_leaves_are_permutations() {
        let descriptor: Descriptor = Group::random(vec![
            target("a:1"),
            target("b:1"),
            target("c:1"),
            target("d:1"),
        ])
        .unwrap()
        .into();

        let expected: HashSet<String> = ["a:1", "b:1", "c:1", "d:1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut orderings = HashSet::new();
        for _ in 0..1000 {
            let leaves = addresses(&descriptor.leaves());
            assert_eq!(leaves.len(), 4);
            let set: HashSet<String> = leaves.iter().cloned().collect();
            assert_eq!(set, expected);
            orderings.insert(leaves);
        }
        assert!(orderings.len() > 1, "random policy never changed the order");
    }

    #[test]
    fn test_load_balanced_alternates() {
        let descriptor: Descriptor = Group::load_balanced(vec![target("a:1"), target("b:1")])
            .unwrap()
            .into();
        for call in 0..10 {
            let leaves = descriptor.leaves();
            let expected = if call % 2 == 0 { "a:1" } else { "b:1" };
            assert_eq!(leaves[0].address(), expected, "call {}", call + 1);
            assert_eq!(leaves.len(), 2);
        }
    }

    #[test]
    fn test_find_by_checksum() {
        let inner = Group::random(vec![target("b:1"), target("c:1")]).unwrap();
        let descriptor: Descriptor = Group::load_balanced(vec![target("a:1"), inner.into()])
            .unwrap()
            .into();

        let found = descriptor.find_by_checksum(checksum("c:1")).unwrap();
        assert_eq!(found.address(), "c:1");
        assert!(descriptor.find_by_checksum(checksum("z:1")).is_none());

        // Searching must not rotate the load-balanced group
        assert_eq!(descriptor.leaves()[0].address(), "a:1");
    }

    #[test]
    fn test_find_by_checksum_returns_first_match() {
        let inner = Group::ordered(vec![target("a:1")]).unwrap();
        let descriptor: Descriptor = Group::ordered(vec![
            Target::new("a:1")
                .unwrap()
                .with_timeouts(crate::TargetTimeouts {
                    connect: std::time::Duration::from_millis(1),
                    ..Default::default()
                })
                .into(),
            inner.into(),
        ])
        .unwrap()
        .into();

        let found = descriptor.find_by_checksum(checksum("a:1")).unwrap();
        assert_eq!(found.connect_timeout(), std::time::Duration::from_millis(1));
    }

    #[test]
    fn test_canonical_leaves_ignore_policy() {
        let descriptor: Descriptor = Group::load_balanced(vec![target("a:1"), target("b:1")])
            .unwrap()
            .into();
        descriptor.leaves();
        assert_eq!(addresses(&descriptor.canonical_leaves()), vec!["a:1", "b:1"]);
    }
}

//! Per-resolution cycle detection.

use crate::error::ResolutionError;
use crate::name::Name;
use fxhash::FxHashSet;

/// Tracks the chain of components being constructed during one resolution.
/// Revisiting a name already on the chain means the dependency graph loops
/// back on itself, and resolution fails with the full chain.
#[derive(Default, Clone)]
pub struct Tracker {
    visited: FxHashSet<Name>,
    stack: Vec<Name>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `name`. Fails with [ResolutionError::Cycle] when `name` is
    /// already on the chain; the error chain starts at the first visit of
    /// `name` and ends with the revisit.
    pub fn push(&mut self, name: &Name) -> Result<(), ResolutionError> {
        if self.visited.contains(name) {
            let start = self
                .stack
                .iter()
                .position(|entry| entry == name)
                .unwrap_or(0);
            let mut chain: Vec<Name> = self.stack[start..].to_vec();
            chain.push(name.clone());
            return Err(ResolutionError::Cycle { chain });
        }

        self.visited.insert(name.clone());
        self.stack.push(name.clone());
        Ok(())
    }

    /// Leaves the most recently entered name.
    pub fn pop(&mut self) {
        if let Some(name) = self.stack.pop() {
            self.visited.remove(&name);
        }
    }

    /// Clones the tracker for a sibling sub-resolution. Two parallel
    /// dependency branches of the same provider must not observe each
    /// other's descents, but both keep the common ancestors so a true loop
    /// through the shared prefix is still caught.
    pub fn branch(&self) -> Tracker {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Name {
        Name::of::<String>(n)
    }

    #[test]
    fn should_allow_distinct_names() {
        let mut tracker = Tracker::new();
        tracker.push(&name("a")).unwrap();
        tracker.push(&name("b")).unwrap();
        tracker.push(&name("c")).unwrap();
    }

    #[test]
    fn should_allow_revisiting_after_pop() {
        let mut tracker = Tracker::new();
        tracker.push(&name("a")).unwrap();
        tracker.pop();
        tracker.push(&name("a")).unwrap();
    }

    #[test]
    fn should_detect_a_direct_cycle() {
        let mut tracker = Tracker::new();
        tracker.push(&name("a")).unwrap();
        let err = tracker.push(&name("a")).unwrap_err();
        match err {
            ResolutionError::Cycle { chain } => {
                assert_eq!(chain, vec![name("a"), name("a")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn should_report_the_full_chain_of_an_indirect_cycle() {
        let mut tracker = Tracker::new();
        tracker.push(&name("root")).unwrap();
        tracker.push(&name("a")).unwrap();
        tracker.push(&name("b")).unwrap();
        let err = tracker.push(&name("a")).unwrap_err();
        match err {
            ResolutionError::Cycle { chain } => {
                assert_eq!(chain, vec![name("a"), name("b"), name("a")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn should_isolate_sibling_branches() {
        let mut tracker = Tracker::new();
        tracker.push(&name("parent")).unwrap();

        let mut left = tracker.branch();
        let mut right = tracker.branch();

        left.push(&name("shared")).unwrap();
        // the sibling branch never saw "shared"
        right.push(&name("shared")).unwrap();
        // but both still see the common ancestor
        assert!(left.push(&name("parent")).is_err());
        assert!(right.push(&name("parent")).is_err());
    }
}

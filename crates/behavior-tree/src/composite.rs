//! Composite behavior nodes.
//!
//! [`Selector`] walks its children in declaration order and never reorders or
//! scores them, so identical contexts always produce identical results.

use crate::{Behavior, Status};

/// Evaluates children in declaration order until one succeeds.
///
/// # Semantics
///
/// - `Success` from a child: stop and return `Success`
/// - `Failure` from a child: try the next child
/// - `Fault` from a child: try the next child (the fault is isolated)
/// - No child succeeded: `Failure`
///
/// Ties are impossible by construction: the first eligible child wins.
pub struct Selector<C> {
    children: Vec<Box<dyn Behavior<C>>>,
}

impl<C> Selector<C> {
    /// Creates a new selector with the given child behaviors.
    ///
    /// # Panics
    ///
    /// Panics if `children` is empty. A selector with no children is
    /// meaningless and likely indicates a programming error.
    pub fn new(children: Vec<Box<dyn Behavior<C>>>) -> Self {
        assert!(
            !children.is_empty(),
            "Selector must have at least one child"
        );
        Self { children }
    }

    /// Number of children in declaration order.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Always `false`; selectors are never empty.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<C> Behavior<C> for Selector<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        for child in &self.children {
            if child.tick(ctx).is_success() {
                return Status::Success;
            }
        }
        Status::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Leaf;

    struct TestContext {
        value: i32,
        visited: Vec<&'static str>,
    }

    fn ctx() -> TestContext {
        TestContext {
            value: 0,
            visited: Vec::new(),
        }
    }

    fn node(name: &'static str, status: Status) -> Box<dyn Behavior<TestContext>> {
        Box::new(Leaf::new(move |ctx: &mut TestContext| {
            ctx.visited.push(name);
            if status.is_success() {
                ctx.value += 1;
            }
            status
        }))
    }

    #[test]
    fn selector_succeeds_on_first_success() {
        let sel = Selector::new(vec![
            node("a", Status::Failure),
            node("b", Status::Success),
            node("c", Status::Success),
        ]);

        let mut ctx = ctx();
        assert_eq!(sel.tick(&mut ctx), Status::Success);
        assert_eq!(ctx.visited, vec!["a", "b"]);
        assert_eq!(ctx.value, 1);
    }

    #[test]
    fn selector_skips_faulted_child() {
        let sel = Selector::new(vec![node("bad", Status::Fault), node("good", Status::Success)]);

        let mut ctx = ctx();
        assert_eq!(sel.tick(&mut ctx), Status::Success);
        assert_eq!(ctx.visited, vec!["bad", "good"]);
    }

    #[test]
    fn selector_fails_when_all_fail() {
        let sel = Selector::new(vec![node("a", Status::Failure), node("b", Status::Fault)]);

        let mut ctx = ctx();
        assert_eq!(sel.tick(&mut ctx), Status::Failure);
    }
}

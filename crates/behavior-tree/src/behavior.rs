//! Core behavior trait.
//!
//! This module defines the [`Behavior`] trait, the single abstraction every
//! node implements. The trait is generic over a context type `C` so the same
//! composites can drive any blackboard.

use crate::Status;

/// A node that can be evaluated against a context.
pub trait Behavior<C>: Send + Sync {
    /// Evaluate this node against the given context.
    ///
    /// Nodes may write into `ctx` (e.g. to bind a selected action), but a
    /// node that returns `Failure` or `Fault` should leave it as it found it.
    fn tick(&self, ctx: &mut C) -> Status;
}

/// Blanket implementation for boxed behaviors.
///
/// Allows `Box<dyn Behavior<C>>` to be used wherever a `Behavior<C>` is
/// expected, so composites can hold heterogeneous children.
impl<C> Behavior<C> for Box<dyn Behavior<C>> {
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (**self).tick(ctx)
    }
}

/// A leaf node built from a closure returning `Status`.
pub struct Leaf<F> {
    f: F,
}

impl<F> Leaf<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<C, F> Behavior<C> for Leaf<F>
where
    F: Fn(&mut C) -> Status + Send + Sync,
{
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (self.f)(ctx)
    }
}

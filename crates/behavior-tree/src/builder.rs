//! Builder utilities for ergonomic tree construction.
//!
//! Instead of writing `Box::new(Selector::new(vec![...]))`, use
//! `selector(vec![...])`.

use crate::{Behavior, FaultSink, Isolate, Selector};

/// Shorthand for `Box::new(Selector::new(children))`.
#[inline]
pub fn selector<C: 'static>(children: Vec<Box<dyn Behavior<C>>>) -> Box<dyn Behavior<C>> {
    Box::new(Selector::new(children))
}

/// Shorthand for `Box::new(Isolate::new(label, child))`.
#[inline]
pub fn isolate<C: FaultSink + 'static>(
    label: impl Into<String>,
    child: Box<dyn Behavior<C>>,
) -> Box<dyn Behavior<C>> {
    Box::new(Isolate::new(label, child))
}

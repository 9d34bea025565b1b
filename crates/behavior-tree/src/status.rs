//! Status returned by behavior nodes.

/// The result of evaluating a behavior node.
///
/// # Tick Semantics
///
/// Every node completes within the tick that evaluates it. There is no
/// `Running` state: a node that cannot decide now fails and is asked again on
/// the next tick with a fresh context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The node's condition held or its action was bound.
    Success,

    /// The node declined. This is an ordinary negative answer.
    Failure,

    /// The node could not be evaluated (bad input, failing guard, panic).
    ///
    /// Composites treat a fault like a failure for control flow, so one
    /// broken node never aborts its siblings.
    Fault,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }
}

impl From<bool> for Status {
    fn from(value: bool) -> Self {
        if value {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

//! Decorator behavior nodes.
//!
//! Decorators wrap a single child behavior and modify its result or execution.
//! [`Isolate`] contains panics.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::{Behavior, Status};

/// Receives faults caught by [`Isolate`].
pub trait FaultSink {
    /// Records that the node labelled `label` panicked with `message`.
    fn record_fault(&mut self, label: &str, message: String);
}

/// Converts a panic inside its child into [`Status::Fault`].
///
/// The panic payload is reported to the context through [`FaultSink`] and the
/// surrounding composite carries on with the next sibling.
pub struct Isolate<C> {
    label: String,
    child: Box<dyn Behavior<C>>,
}

impl<C> Isolate<C> {
    /// Wraps `child`, reporting faults under `label`.
    pub fn new(label: impl Into<String>, child: Box<dyn Behavior<C>>) -> Self {
        Self {
            label: label.into(),
            child,
        }
    }
}

impl<C: FaultSink> Behavior<C> for Isolate<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        match catch_unwind(AssertUnwindSafe(|| self.child.tick(ctx))) {
            Ok(status) => status,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                ctx.record_fault(&self.label, message);
                Status::Fault
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Leaf;

    #[derive(Default)]
    struct TestContext {
        value: i32,
        faults: Vec<(String, String)>,
    }

    impl FaultSink for TestContext {
        fn record_fault(&mut self, label: &str, message: String) {
            self.faults.push((label.to_string(), message));
        }
    }

    fn is_positive() -> Box<dyn Behavior<TestContext>> {
        Box::new(Leaf::new(|ctx: &mut TestContext| Status::from(ctx.value > 0)))
    }

    #[test]
    fn isolate_turns_panic_into_fault() {
        let isolate = Isolate::new(
            "explodes",
            Box::new(Leaf::new(|_: &mut TestContext| -> Status {
                panic!("boom")
            })),
        );

        let mut ctx = TestContext::default();
        assert_eq!(isolate.tick(&mut ctx), Status::Fault);
        assert_eq!(ctx.faults, vec![("explodes".to_string(), "boom".to_string())]);
    }

    #[test]
    fn isolate_passes_through_normal_results() {
        let isolate = Isolate::new("positive", is_positive());

        let mut ctx = TestContext {
            value: 1,
            ..Default::default()
        };
        assert_eq!(isolate.tick(&mut ctx), Status::Success);
        assert!(ctx.faults.is_empty());
    }
}

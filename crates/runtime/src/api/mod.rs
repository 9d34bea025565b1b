//! Public runtime API surface.
//!
//! Collaborator traits the frame loop drives, the handle clients use to talk
//! to a running loop, and the error type shared by both.

pub mod errors;
pub mod handle;
pub mod providers;

pub use errors::{CollaboratorKind, Result, RuntimeError};
pub use handle::FrameHandle;
pub use providers::{ExecutionReport, Executor, Interceptor, NoopInterceptor, SnapshotProvider};

//! Worker tasks that back the frame loop.

mod frame;

pub use frame::{Command, FrameStats, FrameWorker};

//! Capture and decode stages and the slot between them

pub mod capture;
pub mod channel;
pub mod decode;

pub use capture::{CaptureLoop, CaptureStats};
pub use channel::{FrameReceiver, FrameSender, RecvOutcome, SendOutcome, frame_channel};
pub use decode::{DecodeLoop, DecodeOutcome, DecodeStats};

//! Core types shared across the pipeline.
//!
//! - [`Frame`] is one captured image buffer with exclusive, transferable ownership
//! - [`FrameFormat`] and [`PixelFormat`] describe the negotiated buffer layout
//! - [`Credential`] is a parsed network name and secret, each a [`BoundedText`]
//! - [`ConnectionState`], [`LinkStatus`] and [`NetworkEvent`] drive the association state machine

mod credential;
mod frame;
mod link;

pub use credential::{BoundedText, Credential, MAX_FIELD_CHARS};
pub use frame::{Frame, FrameFormat, PixelFormat};
pub use link::{ConnectionState, LinkStatus, NetworkEvent};

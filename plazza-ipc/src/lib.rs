//! Plazza IPC Protocol
//!
//! Length-prefixed textual transport between the reception process and its
//! forked kitchens, plus the prefix-tagged message envelope carried on it.
//! Record payloads stay opaque strings at this layer; their encodings live
//! with the domain types.

mod channel;
mod message;

pub use channel::PipeChannel;
pub use message::Message;

use thiserror::Error;

/// Largest frame either side will accept. A length header above this is
/// treated as a desynchronized stream, not a frame to allocate for.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Transport-level failures of a [`PipeChannel`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to create pipe pair: {0}")]
    Create(std::io::Error),

    #[error("channel is closed")]
    Closed,

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    FrameTooLarge(usize),

    #[error("pipe write failed: {0}")]
    Write(std::io::Error),
}

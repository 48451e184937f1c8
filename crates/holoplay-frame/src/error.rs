/// Errors that can occur while parsing a frame header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame is too short to hold a request id.
    #[error("frame too short ({len} bytes, need 4)")]
    Truncated { len: usize },

    /// The id lacks the reply bit; the frame is not a reply at all.
    #[error("bad frame header: id {id:#010x} is below the reply range")]
    NotAReply { id: u32 },
}

pub type Result<T> = std::result::Result<T, FrameError>;

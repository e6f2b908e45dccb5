//! LanBox command protocol client.
//!
//! Encodes controller operations into the binary frame format
//! (`*XX` opcode marker, big-endian parameters, `#` terminator),
//! frames replies from a stream channel and drives an authenticated
//! session over any async byte channel.
//!
//! # Example
//!
//! ```ignore
//! use lanbox_control::config::{ControllerConfig, SessionConfig};
//! use lanbox_control::lanbox::{Command, Session};
//!
//! let mut session = Session::connect_tcp(&ControllerConfig::default(), &SessionConfig::default()).await?;
//! session.authenticate("777").await?;
//! session.send(&Command::LoadCueList { id: 12 }).await?;
//! session.close().await?;
//! ```

mod frame;
mod io;
mod protocol;
mod session;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use frame::{Decoded, Frame, MAX_PENDING, ResponseBuffer, decode};
pub use protocol::{encode, encode_password, hex};
pub use session::Session;
pub use types::{
    AckMode, Command, FRAME_LEAD, MAX_LAYER_NAME_LEN, MAX_PASSWORD_LEN, MixMode, PASSWORD_TERMINATOR, ReplyKind,
    SessionState, TERMINATOR, TransportKind,
};

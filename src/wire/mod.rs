//! Plant ↔ controller wire protocol
//!
//! One TCP connection per session carries frames in strict
//! request/response order: a `Measurement` from the plant, then a
//! `ControlOutput` from the controller, never more than one exchange in
//! flight. An optional `Hello`/`HelloAck` pair precedes the first cycle.
//! Pause/resume travels on a separate line-based connection.

pub mod control;
pub mod frame;
pub mod handshake;

pub use control::{spawn_listener, CommandSender, ControlCommand, PauseFlag};
pub use frame::{read_expected, read_frame, write_frame, FrameHeader, FrameKind};
pub use handshake::{client_handshake, server_handshake, HelloAck, SessionDescriptor};

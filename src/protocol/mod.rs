//! Protocol Module
//!
//! Defines the wire protocol and the command language.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Payload             │
//! └──────────┴─────────────────────────────┘
//! ```
//! Length is big-endian. Requests and responses use the same frame, with
//! UTF-8 text payloads. There is no version byte and no checksum.
//!
//! ### Commands
//! ```text
//! GET <key>
//! SET <key> <value>
//! DEL <key>
//! ```
//! Names are case-sensitive; a line holds at most three tokens.
//!
//! ### Responses
//! - GET hit: the stored value
//! - GET miss: `record with key "<key>" not found`
//! - SET, DEL: `ok`
//! - rejected line: `invalid query: <reason>`
//! - engine failure: `error: <message>`

mod codec;
mod command;
mod parser;
mod response;

pub use codec::{encode_frame, read_frame, read_length, read_payload, write_frame, HEADER_SIZE};
pub use command::{Command, CommandName};
pub use parser::{parse, MAX_TOKENS};
pub use response::Response;

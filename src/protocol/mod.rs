//! Protocol Module
//!
//! Defines the wire protocol for client-emulator communication.
//!
//! ## Protocol Format (V1 - Framed bincode)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: PING
//! - 0x02: CREATE_TABLE         0x03: DELETE_TABLE
//! - 0x04: GET_TABLE            0x05: LIST_TABLES
//! - 0x06: MODIFY_FAMILIES      0x07: DROP_ROW_RANGE
//! - 0x08: MUTATE_ROW           0x09: MUTATE_ROWS
//! - 0x0a: READ_ROWS            0x0b: CHECK_AND_MUTATE_ROW
//! - 0x0c: READ_MODIFY_WRITE_ROW
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: ALREADY_EXISTS
//! - 0x04: INVALID_ARGUMENT

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, ReadRowsRequest, RowMutations};
pub use response::{EntryStatus, Reply, Response, Status, TableInfo};
pub use codec::{
    decode_command, decode_reply, decode_response, encode_command, encode_reply, encode_response,
    read_command, read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};

//! bitwire is a binary struct codec for fixed-layout records: protocol messages, file records,
//! device structures.
//!
//! A record type declares its fields, their order, its byte order and, for each array, how many
//! elements it carries. The first time a type is used, that declaration is compiled into a
//! playbook of per-field operations and the type's encoded size is classified as constant or
//! instance-dependent. Every serialize, deserialize and size call replays that playbook.
//! There is no framing: the wire format is the concatenation of the fields in declaration
//! order.
//!
//! # Quickstart
//!
//! ```
//! # #[cfg(feature = "derive")] {
//! use bitwire::{bit_enum, BitStruct, SizeClass};
//!
//! bit_enum! {
//!     pub enum Command: u8 {
//!         Read = 1,
//!         Write = 2,
//!     }
//! }
//!
//! #[derive(BitStruct, Default, Debug, PartialEq)]
//! #[bitwire(endian = "big")]
//! struct Header {
//!     command: Command,
//!     address: u32,
//! }
//!
//! #[derive(BitStruct, Default, Debug, PartialEq)]
//! #[bitwire(endian = "big")]
//! struct Request {
//!     header: Header,
//!     #[bitwire(fixed = 2)]
//!     flags: Vec<u8>,
//!     #[bitwire(end_fill)]
//!     payload: Vec<u16>,
//! }
//!
//! let request = Request {
//!     header: Header { command: Command::Write, address: 0x1000 },
//!     flags: vec![1],
//!     payload: vec![0xBEEF],
//! };
//! let bytes = bitwire::serialize(&request).unwrap();
//! assert_eq!(bytes, [2, 0, 0, 0x10, 0, 1, 0, 0xBE, 0xEF]);
//!
//! let (decoded, read) = bitwire::deserialize::<Request>(&bytes).unwrap();
//! assert_eq!(read, bytes.len());
//! // Fixed arrays come back at their declared length.
//! assert_eq!(decoded.flags, [1, 0]);
//!
//! assert_eq!(bitwire::schema::<Header>().unwrap().size_class(), SizeClass::Const(5));
//! assert_eq!(bitwire::wire_size::<Request>().unwrap(), None);
//! # }
//! ```
//!
//! # Field types
//!
//! |Type|Wire form|
//! |---|---|
//! |`u8 i8 u16 i16 u32 i32 u64 i64`|The integer in the struct's byte order|
//! |[`bit_enum!`] enums|The underlying integer. Unknown values decode unchanged|
//! |[`BitStruct`] types|The nested struct in its own byte order|
//! |`Vec<E>` of the above|Elements back to back, per the field's [`ArrayPolicy`]|
//!
//! Anything else, including arrays of arrays, is rejected the first time the containing type
//! is used, with a [`SchemaError`] naming the type and field.
//!
//! # Derive attributes
//!
//! ## Top level
//! |Attribute|Type|Default|Description
//! |---|---|---|---|
//! |`endian`|`"little"` or `"big"`|`"little"`|Byte order of the struct's multi-byte fields. Not inherited by nested structs.|
//!
//! ## Field level
//! |Attribute|Type|Default|Description
//! |---|---|---|---|
//! |`fixed`|`usize`|`None`|`Vec` field with exactly this many elements on the wire. Short arrays are backfilled with zero elements.|
//! |`end_fill`|flag|`None`|`Vec` field that runs to the end of the input. Must be the last field. A struct ending in one may only be nested as the last field, never as an array element.|
//!
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub use error::{
    Error, ReadError, ReadResult, Result, SchemaError, SchemaErrorKind, WriteError, WriteResult,
};
pub mod io;
mod schema;
pub use schema::*;
mod serde;
pub use serde::*;
#[cfg(test)]
mod proptest_config;
#[cfg(feature = "derive")]
pub use bitwire_derive::*;

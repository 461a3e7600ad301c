// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Waypoint parser
//!
//! Decoding of DNS queries and encoding of DNS responses, byte for byte.
//!
//! ```
//! use waypoint_parser::{DnsHeader, HeaderPolicy, Question, HEADER_SIZE};
//!
//! let query = [
//!     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
//!     7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // example.com
//!     0x00, 0x01, 0x00, 0x01, // A IN
//! ];
//! let header = DnsHeader::parse(&query, HeaderPolicy::Strict).unwrap();
//! let (question, next) = Question::parse(&query, HEADER_SIZE).unwrap();
//!
//! assert_eq!(header.id, 0x1234);
//! assert_eq!(question.name.as_str(), "example.com");
//! assert_eq!(next, query.len());
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

use thiserror::Error;

mod binutils;
pub mod body;
pub mod header;
pub mod writer;

pub use body::name::Name;
pub use body::{Class, QType, Question, RecordData};
pub use header::*;
pub use writer::MessageWriter;

/// Size in bytes of a DNS header.
pub const HEADER_SIZE: usize = 12;

// +---------------------+
// |        Header       |
// +---------------------+
// |       Question      | the question(s) for the name server
// +---------------------+
// |        Answer       | RRs answering the question
// +---------------------+
// |      Authority      | RRs pointing toward an authority
// +---------------------+
// |      Additional     | RRs holding additional information
// +---------------------+

/// Errors produced while decoding a DNS packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The packet cannot hold a DNS header.
    #[error(
        "Length of packet ({0} bytes) is too small to contain a DNS header ({} bytes in length).",
        HEADER_SIZE
    )]
    Malformed(usize),
    /// A read went past the end of the packet.
    #[error("Out-of-bounds read attempt at position {0}")]
    Truncated(usize),
    /// The header is well formed but violates the header policy.
    #[error("Header rejected by policy: {0}")]
    InvalidHeader(HeaderViolation),
    /// The question asks for a type this server does not answer.
    #[error("Query type {0} is not supported.")]
    InvalidQType(u16),
    /// The question asks for a class this server does not answer.
    #[error("Query class {0} is not supported.")]
    InvalidQClass(u16),
    /// A compression pointer leads back to an already visited position.
    #[error("Compression pointer loop detected at position {0}")]
    PointerLoop(usize),
    /// A label is longer than the DNS maximum.
    #[error(
        "Label length ({0}) is bigger than DNS specification (maximum {}).",
        crate::body::name::MAX_LABEL_SIZE
    )]
    LabelTooLong(usize),
    /// A decoded domain name is longer than the DNS maximum.
    #[error(
        "Name length ({0}) is bigger than DNS specification (maximum {}).",
        crate::body::name::MAX_NAME_SIZE
    )]
    NameTooLong(usize),
    /// A label is not valid UTF-8.
    #[error("Non UTF-8 label: {0}")]
    NonUtf8(#[from] std::str::Utf8Error),
}

/// The reason a header was rejected by [HeaderPolicy::Strict].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderViolation {
    /// A query must carry at least one question.
    #[error("no questions present (QDCOUNT = 0)")]
    NoQuestions,
    /// Too many questions in a single packet, treated as a flood.
    #[error("too many questions (QDCOUNT = {0}, maximum {})", crate::header::MAX_QUESTIONS)]
    TooManyQuestions(u16),
    /// Only standard, inverse and status queries are accepted.
    #[error("unsupported opcode {0}")]
    Opcode(u16),
}

/// Errors produced while encoding a DNS response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// A label is longer than the DNS maximum.
    #[error(
        "Label length ({0}) is bigger than DNS specification (maximum {}).",
        crate::body::name::MAX_LABEL_SIZE
    )]
    LabelTooLong(usize),
    /// A domain name is longer than the DNS maximum.
    #[error(
        "Name length ({0}) is bigger than DNS specification (maximum {}).",
        crate::body::name::MAX_NAME_SIZE
    )]
    NameTooLong(usize),
    /// A TXT string does not fit its one byte length prefix.
    #[error("TXT data length ({0}) does not fit in a character-string (maximum 255).")]
    TxtTooLong(usize),
    /// RDATA does not fit in RDLENGTH.
    #[error("RDATA length ({0}) does not fit in RDLENGTH (maximum 65535).")]
    RdataTooLong(usize),
}

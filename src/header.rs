// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fixed size header that starts every DNS message.

use crate::binutils::*;
use crate::{HeaderViolation, ParseError, HEADER_SIZE};

/// Maximum number of questions accepted by [HeaderPolicy::Strict].
pub const MAX_QUESTIONS: u16 = 9;

macro_rules! u16_flag {
    (
        $(#[$outer:meta])*
        $bits:literal is $typ:tt with: $(
            #[$inner:meta]
            $variant:tt = $value:literal
        )+
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum $typ {
            $(
                #[$inner]
                $variant = $value,
            )*
        }

        impl From<u16> for $typ {
            #[inline]
            fn from(n: u16) -> Self {
                match $crate::header::mask_shift($bits, n) {
                    $($value => Self::$variant,)*
                    _ => ::std::unreachable!("Bitwise operations should make this imposible. Failed with mask {} for value {}", $bits, n),
                }
            }
        }

        impl From<$typ> for u16 {
            #[inline]
            fn from(flag: $typ) -> Self {
                $crate::header::unshift($bits, flag as u16)
            }
        }
    };
}

// Multi-bit fields keep every value they can carry, so a header always
// survives a decode/encode cycle unchanged. Policy is applied separately.
macro_rules! u16_code {
    (
        $(#[$outer:meta])*
        $bits:literal is $typ:tt with: $(
            #[$inner:meta]
            $variant:tt = $value:literal
        )+
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum $typ {
            $(
                #[$inner]
                $variant,
            )*
            /// A value without a name in this implementation.
            Unknown(u16),
        }

        impl From<u16> for $typ {
            #[inline]
            fn from(n: u16) -> Self {
                match $crate::header::mask_shift($bits, n) {
                    $($value => Self::$variant,)*
                    n => Self::Unknown(n),
                }
            }
        }

        impl From<$typ> for u16 {
            #[inline]
            fn from(code: $typ) -> Self {
                let n = match code {
                    $($typ::$variant => $value,)*
                    $typ::Unknown(n) => n,
                };
                $crate::header::unshift($bits, n) & $bits
            }
        }
    };
}

#[inline]
fn mask_shift(mask: u16, n: u16) -> u16 {
    (n & mask) >> mask.trailing_zeros()
}

#[inline]
fn unshift(mask: u16, n: u16) -> u16 {
    n << mask.trailing_zeros()
}

/// How strictly an incoming header is checked before its questions are read.
///
/// [HeaderPolicy::Strict] only lets through packets with between 1 and
/// [MAX_QUESTIONS] questions and an opcode of `QUERY`, `IQUERY` or `STATUS`.
/// The question bound protects the server from packets that try to make it do
/// a lot of work. [HeaderPolicy::Lenient] only requires the 12 header bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Enforce question count and opcode bounds.
    #[default]
    Strict,
    /// Accept any header that can be read.
    Lenient,
}

/// A DNS header.
///
/// The header of a DNS packet follows the following structure:
///
/// ```text
///       0  1  2  3  4  5  6  7  0  1  2  3  4  5  6  7
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsHeader {
    /// Transaction identifier chosen by the client
    pub id: u16,
    /// The different flags of a DNS header.
    pub flags: Flags,
    /// Question records count
    pub questions: u16,
    /// Answer records count
    pub answers: u16,
    /// Name server records count
    pub authority: u16,
    /// Aditional records count
    pub additional: u16,
}

impl TryFrom<&[u8]> for DnsHeader {
    type Error = ParseError;

    /// Read the header fields without applying any [HeaderPolicy].
    #[inline]
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < HEADER_SIZE {
            Err(ParseError::Malformed(bytes.len()))?
        } else {
            let header = DnsHeader {
                id: safe_u16_read(bytes, 0)?,
                flags: safe_u16_read(bytes, 2)?.into(),
                questions: safe_u16_read(bytes, 4)?,
                answers: safe_u16_read(bytes, 6)?,
                authority: safe_u16_read(bytes, 8)?,
                additional: safe_u16_read(bytes, 10)?,
            };
            Ok(header)
        }
    }
}

impl From<&DnsHeader> for Vec<u8> {
    #[inline]
    fn from(header: &DnsHeader) -> Self {
        let mut target = Vec::with_capacity(HEADER_SIZE);
        header.serialize(&mut target);
        target
    }
}

impl DnsHeader {
    /// Read a header from the start of `bytes` and check it against `policy`.
    ///
    /// # Errors
    ///
    /// [ParseError::Malformed] if there are less than 12 bytes and
    /// [ParseError::InvalidHeader] if the header breaks the policy.
    #[inline]
    pub fn parse(bytes: &[u8], policy: HeaderPolicy) -> Result<Self, ParseError> {
        let header = DnsHeader::try_from(bytes)?;
        if policy == HeaderPolicy::Strict {
            header.validate()?;
        }
        Ok(header)
    }

    /// Check the question count and opcode bounds of [HeaderPolicy::Strict].
    pub fn validate(&self) -> Result<(), ParseError> {
        let violation = match (self.questions, self.flags.opcode) {
            (0, _) => HeaderViolation::NoQuestions,
            (n, _) if n > MAX_QUESTIONS => HeaderViolation::TooManyQuestions(n),
            (_, OpCode::Query | OpCode::Iquery | OpCode::Status) => return Ok(()),
            (_, opcode) => HeaderViolation::Opcode(opcode.into_raw()),
        };
        Err(ParseError::InvalidHeader(violation))
    }

    /// Serialize a [DnsHeader] into a vector of bytes.
    ///
    /// Usefult when you need to be able to apend the bytes to an existing `Vec<u8>`,
    /// in any other case the `From` trait is implemented to be able to convert from an
    /// [DnsHeader] to an `Vec<u8>`.
    #[inline]
    pub fn serialize(&self, target: &mut Vec<u8>) {
        push_u16(target, self.id);
        push_u16(target, self.flags.into());
        push_u16(target, self.questions);
        push_u16(target, self.answers);
        push_u16(target, self.authority);
        push_u16(target, self.additional);
    }
}

/// DNS Flags
///
/// ```text
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// QR: Query (0) or Response (1)
/// OPCODE: Standard query (0), Inverse query (1), Server status query (2), Notify (4), Update (5), DSO (6)
/// AA: Authoritative Answer
/// TC: TrunCation
/// RD: Recursion Desired
/// RA: Recursion Available
/// Z: Zero (reserved)
/// AD: Authentic data (for DNSSEC)
/// CD: Checking disabled (for DNSSEC)
/// RCODE: Response code NOERROR (0), FORMERR (1), SERVFAIL (2), NXDOMAIN (3), NOTIMP (4), REFUSED (5)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flags {
    /// Query (0) or Response (1)
    pub qr: QueryResponse,
    /// Standard query (0), Inverse query (1), Server status query (2), Notify (4), Update (5), DSO (6)
    pub opcode: OpCode,
    /// The answer is authoritative.
    pub aa: AuthoritativeAnswer,
    /// The packet has been truncated.
    pub tc: TrunCation,
    /// The client desires recursion.
    pub rd: RecursionDesired,
    /// The server has recursion availbale.
    pub ra: RecursionAvailable,
    /// Reserved (has to be 0).
    pub z: Zero,
    /// Authentic data (for DNSSEC)
    pub ad: AuthenticData,
    /// Checking disabled (for DNSSEC)
    pub cd: CheckingDisabled,
    /// Response code NOERROR (0), FORMERR (1), SERVFAIL (2), NXDOMAIN (3), NOTIMP (4), REFUSED (5)
    pub rcode: ResponseCode,
}

impl From<u16> for Flags {
    #[inline]
    fn from(n: u16) -> Self {
        Flags {
            qr: n.into(),
            opcode: n.into(),
            aa: n.into(),
            tc: n.into(),
            rd: n.into(),
            ra: n.into(),
            z: n.into(),
            ad: n.into(),
            cd: n.into(),
            rcode: n.into(),
        }
    }
}

impl From<Flags> for u16 {
    #[inline]
    fn from(flags: Flags) -> Self {
        u16::from(flags.qr)
            | u16::from(flags.opcode)
            | u16::from(flags.aa)
            | u16::from(flags.tc)
            | u16::from(flags.rd)
            | u16::from(flags.ra)
            | u16::from(flags.z)
            | u16::from(flags.ad)
            | u16::from(flags.cd)
            | u16::from(flags.rcode)
    }
}

impl OpCode {
    /// The opcode as the 4 bit number carried on the wire.
    #[inline]
    pub fn into_raw(self) -> u16 {
        mask_shift(OPCODE_MASK, u16::from(self))
    }
}

impl ResponseCode {
    /// The response code as the 4 bit number carried on the wire.
    #[inline]
    pub fn into_raw(self) -> u16 {
        u16::from(self)
    }
}

const OPCODE_MASK: u16 = 0b0111100000000000;

u16_flag! {
    /// Query (0) or Response (1) packet.
    0b1000000000000000 is QueryResponse with:
        /// Query packet
        Query = 0
        /// Response packet
        Response = 1
}

u16_code! {
    /// Standard query (0), Inverse query (1), Server status query (2), Notify (4), Update (5), DSO (6)
    0b0111100000000000 is OpCode with:
        /// Standard query
        Query = 0
        /// Inverse query
        Iquery = 1
        /// Server status query
        Status = 2
        /// Notify
        Notify = 4
        /// Update
        Update = 5
        /// DSO
        Dso = 6
}

u16_flag! {
    /// Flag to indicate if the answer is authoritative
    0b0000010000000000 is AuthoritativeAnswer with:
        /// The answer is not authoritative
        NonAuthoritative = 0
        /// The answer is authoritative
        Authoritative = 1
}

u16_flag! {
    /// Flag to indicate if the packet has been truncated.
    0b0000001000000000 is TrunCation with:
        /// The packet has not been truncated
        NotTruncated = 0
        /// The packet has been truncated
        Truncated = 1
}

u16_flag! {
    /// Flag to indicate if recursion is desired by the client.
    0b0000000100000000 is RecursionDesired with:
        /// Recursion is not desired
        NotDesired = 0
        /// Recursion is desired
        Desired = 1
}

u16_flag! {
    /// Flag to indicate if recursion is available by the server.
    0b0000000010000000 is RecursionAvailable with:
        /// Recursion is not available
        NotAvailable = 0
        /// Recursion is available
        Available = 1
}

u16_flag! {
    /// Reserved, should be 0.
    0b0000000001000000 is Zero with:
        /// Standard value
        Zero = 0
        /// Not used value.
        Reserved = 1
}

u16_flag! {
    /// DNSSEC flag to indicate if the data has been cryptographically authenticated
    0b0000000000100000 is AuthenticData with:
        /// The data is not cryptographically authenticated
        NotAuthentic = 0
        /// The data is cryptographically authenticated
        Authentic = 1
}

u16_flag! {
    /// DNSSEC flag to indicate if the client has enabled checking of the data.
    0b0000000000010000 is CheckingDisabled with:
        /// Checking has been enabled
        Enabled = 0
        /// Checking has been disabled
        Disabled = 1
}

u16_code! {
    /// Response code
    0b0000000000001111 is ResponseCode with:
        /// There was no error.
        NoError = 0
        /// Format error - The name server was unable to interpret the query.
        FormErr = 1
        /// Server failure - The name server was unable to process this query due to a problem with the name server.
        ServFail = 2
        /// Name Error - Meaningful only for responses from an authoritative name server, this code signifies that the domain name referenced in the query does not exist.
        NXDomain = 3
        /// Not Implemented - The name server does not support the requested kind of query.
        NotImp = 4
        /// Refused - The name server refuses to perform the specified operation for policy reasons.
        Refused = 5
}

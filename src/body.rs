// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Domain name structure and funtions
pub mod name;

use crate::binutils::*;
use crate::body::name::Name;
use crate::ParseError;

macro_rules! codes {
    (
        $(#[$outer:meta])*
        $typ:ident rejects with $err:ident: $(
            #[$inner:meta]
            $variant:tt = $value:literal
        )+
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub enum $typ {
            $(
                #[$inner]
                $variant = $value,
            )*
        }

        impl TryFrom<u16> for $typ {
            type Error = ParseError;

            #[inline]
            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    _ => Err(ParseError::$err(value)),
                }
            }
        }

        impl From<$typ> for u16 {
            #[inline]
            fn from(value: $typ) -> Self {
                value as u16
            }
        }
    };
}

codes! {
    /// The record types this server answers questions for.
    QType rejects with InvalidQType:
        /// A host address (IPv4)
        A = 1
        /// An authoritative name server
        Ns = 2
        /// The canonical name for an alias
        Cname = 5
        /// Marks the start of a zone of authority
        Soa = 6
        /// A mail exchange
        Mx = 15
        /// Text strings
        Txt = 16
        /// A host address (IPv6)
        Aaaa = 28
}

codes! {
    /// The DNS classes a question may ask for.
    Class rejects with InvalidQClass:
        /// IN: the Internet
        IN = 1
        /// CH: the CHAOS class
        CH = 3
        /// HS: Hesiod [Dyer 87]
        HS = 4
}

/// A query for a resource record of the specified [QType] and [Class].
///
/// ```text
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                                               |
///    /                     QNAME                     /
///    /                                               /
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                     QTYPE                     |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                     QCLASS                    |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// The domain name to be queried
    pub name: Name,
    /// The type of record being queried
    pub qtype: QType,
    /// The class of record being queried
    pub class: Class,
}

impl Question {
    /// Parse from the specified `buff`, starting at position `start`.
    ///
    /// Returns the question and the position right after its QCLASS field. When the name
    /// is compressed that position follows the pointer, not the bytes it points to.
    ///
    /// # Errors
    ///
    /// It will error if the buffer does not contain a valid question or if its type or class
    /// are not supported. If the domain name in the question has been compressed the buffer
    /// should include all previous bytes from the DNS packet to be considered valid.
    #[inline]
    pub fn parse(buff: &[u8], start: usize) -> Result<(Self, usize), ParseError> {
        let (name, n) = Name::parse(buff, start)?;
        let qtype = safe_u16_read(buff, n)?;
        let class = safe_u16_read(buff, n + 2)?;
        Ok((
            Question {
                name,
                qtype: qtype.try_into()?,
                class: class.try_into()?,
            },
            n + 4,
        ))
    }
}

/// The RDATA of an answer, already in the form it takes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordData<'a> {
    /// A single character-string, written with its one byte length prefix.
    Txt(&'a [u8]),
    /// Bytes written unchanged, like the 4 octets of an A record.
    Raw(&'a [u8]),
}

impl<'a> RecordData<'a> {
    /// Pick the representation used on the wire for a value of type `qtype`.
    #[inline]
    pub fn new(qtype: QType, value: &'a [u8]) -> Self {
        match qtype {
            QType::Txt => Self::Txt(value),
            _ => Self::Raw(value),
        }
    }
}

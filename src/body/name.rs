// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::binutils::*;
use crate::{ParseError, SerializeError};
use std::collections::HashSet;
use std::fmt;
use std::str;

pub(crate) const MAX_LABEL_SIZE: usize = 63;
pub(crate) const MAX_NAME_SIZE: usize = 255;

const INIT_CAP: usize = 32;
const POINTER_MASK: u16 = 0b0011_1111_1111_1111;

/// A domain name as the dot separated list of its labels.
///
/// Labels keep the case they were received with and the root domain is the empty name.
///
/// ```
/// # use waypoint_parser::Name;
/// let name = Name::from("Example.com");
/// assert_eq!(name.as_str(), "Example.com");
/// assert_eq!(name.labels().collect::<Vec<_>>(), vec!["Example", "com"]);
/// assert!(Name::root().is_root());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name(String);

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Name {
    #[inline]
    fn from(name: &str) -> Self {
        Name(name.to_string())
    }
}

impl From<String> for Name {
    #[inline]
    fn from(name: String) -> Self {
        Name(name)
    }
}

impl AsRef<str> for Name {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Name {
    /// The root domain.
    #[inline]
    pub fn root() -> Self {
        Name(String::new())
    }

    /// Parse from the specified `buff`, starting at position `start`.
    ///
    /// Returns the name and the position where the next field starts. If the name has been
    /// compressed that is the position after the first pointer.
    ///
    /// # Errors
    ///
    /// It will error if the buffer does not contain a valid domain name. If the domain name
    /// has been compressed the buffer should include all previous bytes from the DNS packet
    /// to be considered valid. A pointer that leads to a position already visited while
    /// reading this name is a [ParseError::PointerLoop].
    pub fn parse(buff: &[u8], start: usize) -> Result<(Self, usize), ParseError> {
        let mut name = String::with_capacity(INIT_CAP);
        let mut visited = HashSet::new();
        let mut resume = None;
        let mut pos = start;
        loop {
            if !visited.insert(pos) {
                Err(ParseError::PointerLoop(pos))?;
            }
            match read_label_metadata(buff, pos)? {
                LabelMeta::End => return Ok((Name(name), resume.unwrap_or(pos + 1))),
                LabelMeta::Pointer(ptr) => {
                    resume.get_or_insert(pos + 2);
                    pos = ptr;
                }
                LabelMeta::Size(size) => {
                    let label = str::from_utf8(safe_slice_read(buff, pos + 1, size)?)?;
                    if !name.is_empty() {
                        name.push('.');
                    }
                    name.push_str(label);
                    if name.len() > MAX_NAME_SIZE {
                        Err(ParseError::NameTooLong(name.len()))?;
                    }
                    pos += size + 1;
                }
            }
        }
    }

    /// Serialize the [Name] without compression and append it to the end of `packet`.
    ///
    /// # Errors
    ///
    /// A label longer than 63 bytes or a name longer than 255 bytes on the wire.
    pub fn serialize(&self, packet: &mut Vec<u8>) -> Result<(), SerializeError> {
        let wire_len = self.wire_len()?;
        packet.reserve(wire_len);
        for label in self.labels() {
            packet.push(label.len() as u8);
            packet.extend(label.as_bytes());
        }
        packet.push(0u8);
        Ok(())
    }

    /// The name as text, without a trailing dot.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the root domain.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.labels().next().is_none()
    }

    /// Return an iterator over the labels in human order. Empty labels are skipped.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|label| !label.is_empty())
    }

    /// The number of bytes the uncompressed name takes on the wire.
    pub(crate) fn wire_len(&self) -> Result<usize, SerializeError> {
        let mut len = 1;
        for label in self.labels() {
            if label.len() > MAX_LABEL_SIZE {
                Err(SerializeError::LabelTooLong(label.len()))?;
            }
            len += label.len() + 1;
        }
        if len > MAX_NAME_SIZE {
            Err(SerializeError::NameTooLong(len))?;
        }
        Ok(len)
    }
}

enum LabelMeta {
    End,
    // Although it is really an u8 because it is used for indexing we give an usize
    Size(usize),
    // Although it is really an u16 because it is used for indexing we give an usize
    Pointer(usize),
}

#[inline]
fn read_label_metadata(buff: &[u8], pos: usize) -> Result<LabelMeta, ParseError> {
    let b = safe_u8_read(buff, pos)?;
    match b {
        0 => Ok(LabelMeta::End),
        1..=0b0011_1111 => Ok(LabelMeta::Size(b as _)),
        0b1100_0000..=0xFF => Ok(LabelMeta::Pointer(
            (safe_u16_read(buff, pos)? & POINTER_MASK) as _,
        )),
        _ => Err(ParseError::LabelTooLong(b as _)),
    }
}

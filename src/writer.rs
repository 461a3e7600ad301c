// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of response packets with domain name compression.

use std::collections::HashMap;

use crate::binutils::*;
use crate::body::name::Name;
use crate::body::{Class, QType, Question, RecordData};
use crate::header::{DnsHeader, Flags};
use crate::{SerializeError, HEADER_SIZE};

const INIT_PACKET_SIZE: usize = 512;
const MAX_TXT_SIZE: usize = 255;
const FLAGS_POS: usize = 2;
const ANSWERS_POS: usize = 6;
// Pointers only have 14 bits to address the packet.
const MAX_POINTER: usize = 0b0011_1111_1111_1111;
const POINTER_TAG: u16 = 0b1100_0000_0000_0000;

/// Writes a DNS message front to back.
///
/// The header goes first and can be patched once the rest of the message is known. Every
/// domain name written through the writer is remembered with its position, and writing the
/// exact same name again emits a two byte pointer to the first occurrence instead of its
/// labels.
///
/// ```
/// use waypoint_parser::*;
///
/// let header = DnsHeader::try_from(&[0x12, 0x34, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0][..]).unwrap();
/// let question = Question {
///     name: Name::from("example.com"),
///     qtype: QType::A,
///     class: Class::IN,
/// };
///
/// let mut writer = MessageWriter::new(&header);
/// writer.question(&question).unwrap();
/// writer
///     .answer(&question.name, QType::A, Class::IN, 300, RecordData::Raw(&[127, 0, 0, 1]))
///     .unwrap();
/// writer.set_answers(1);
/// let packet = writer.finish();
///
/// // The answer refers back to the name in the question.
/// assert_eq!(&packet[29..31], &[0xC0, 12]);
/// assert_eq!(&packet[packet.len() - 4..], &[127, 0, 0, 1]);
/// ```
#[derive(Debug)]
pub struct MessageWriter {
    packet: Vec<u8>,
    names: HashMap<String, u16>,
}

impl MessageWriter {
    /// Start a message with `header`.
    pub fn new(header: &DnsHeader) -> Self {
        let mut packet = Vec::with_capacity(INIT_PACKET_SIZE);
        header.serialize(&mut packet);
        MessageWriter {
            packet,
            names: HashMap::new(),
        }
    }

    /// Append a domain name, compressed if it has already been written.
    ///
    /// # Errors
    ///
    /// A label longer than 63 bytes or a name longer than 255 bytes on the wire.
    /// Nothing is written in that case.
    pub fn name(&mut self, name: &Name) -> Result<(), SerializeError> {
        if name.is_root() {
            self.packet.push(0u8);
            return Ok(());
        }
        if let Some(&pos) = self.names.get(name.as_str()) {
            push_u16(&mut self.packet, POINTER_TAG | pos);
            return Ok(());
        }
        let pos = self.packet.len();
        name.serialize(&mut self.packet)?;
        if pos <= MAX_POINTER {
            self.names.insert(name.as_str().to_string(), pos as u16);
        }
        Ok(())
    }

    /// Append a question section.
    pub fn question(&mut self, question: &Question) -> Result<(), SerializeError> {
        self.name(&question.name)?;
        push_u16(&mut self.packet, question.qtype.into());
        push_u16(&mut self.packet, question.class.into());
        Ok(())
    }

    /// Append a resource record to the current section.
    ///
    /// # Errors
    ///
    /// Besides the errors of [MessageWriter::name], TXT data longer than 255 bytes and any
    /// data longer than 65535 bytes are rejected before anything is written.
    pub fn answer(
        &mut self,
        name: &Name,
        qtype: QType,
        class: Class,
        ttl: u32,
        data: RecordData<'_>,
    ) -> Result<(), SerializeError> {
        let rdlen = match data {
            RecordData::Txt(txt) if txt.len() > MAX_TXT_SIZE => {
                Err(SerializeError::TxtTooLong(txt.len()))?
            }
            RecordData::Txt(txt) => txt.len() + 1,
            RecordData::Raw(raw) => raw.len(),
        };
        let rdlen = u16::try_from(rdlen).map_err(|_| SerializeError::RdataTooLong(rdlen))?;

        self.name(name)?;
        push_u16(&mut self.packet, qtype.into());
        push_u16(&mut self.packet, class.into());
        push_u32(&mut self.packet, ttl);
        push_u16(&mut self.packet, rdlen);
        match data {
            RecordData::Txt(txt) => {
                self.packet.push(txt.len() as u8);
                self.packet.extend(txt);
            }
            RecordData::Raw(raw) => self.packet.extend(raw),
        }
        Ok(())
    }

    /// Overwrite the flags already written in the header.
    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        put_u16(&mut self.packet, FLAGS_POS, flags.into());
    }

    /// Overwrite the answer count already written in the header.
    #[inline]
    pub fn set_answers(&mut self, answers: u16) {
        put_u16(&mut self.packet, ANSWERS_POS, answers);
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.packet.len()
    }

    /// `true` when nothing but the header has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packet.len() == HEADER_SIZE
    }

    /// Return the finished message.
    #[inline]
    pub fn finish(self) -> Vec<u8> {
        self.packet
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use waypoint_parser::*;

const REQ: &[u8] = &[
    0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
    0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, // example.com
    0x00, 0x01, 0x00, 0x01, // A IN
];

#[test]
fn test_parse_request() {
    let header = DnsHeader::parse(REQ, HeaderPolicy::Strict).unwrap();

    assert_eq!(header.id, 0x1234);
    assert_eq!(header.flags.qr, QueryResponse::Query);
    assert_eq!(header.flags.opcode, OpCode::Query);
    assert_eq!(header.flags.rd, RecursionDesired::Desired);
    assert_eq!(header.questions, 1);
    assert_eq!(header.answers, 0);
    assert_eq!(header.authority, 0);
    assert_eq!(header.additional, 0);

    let (question, next) = Question::parse(REQ, HEADER_SIZE).unwrap();
    assert_eq!(question.name.as_str(), "example.com");
    assert_eq!(question.qtype, QType::A);
    assert_eq!(question.class, Class::IN);
    assert_eq!(next, REQ.len());
}

#[test]
fn test_header_round_trip() {
    for flags in [0x0000u16, 0x0100, 0x8180, 0x8583, 0x1000, 0xFFFF] {
        let header = DnsHeader {
            id: 0xBEEF,
            flags: flags.into(),
            questions: 3,
            answers: 2,
            authority: 1,
            additional: 65535,
        };
        let bytes = Vec::<u8>::from(&header);
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(DnsHeader::try_from(&bytes[..]).unwrap(), header);
    }
}

#[test]
fn test_compressed_response_round_trip() {
    let header = DnsHeader::parse(REQ, HeaderPolicy::Strict).unwrap();
    let (question, _) = Question::parse(REQ, HEADER_SIZE).unwrap();
    let txt = Question {
        qtype: QType::Txt,
        ..question.clone()
    };

    let mut writer = MessageWriter::new(&header);
    writer.question(&question).unwrap();
    writer.question(&txt).unwrap();
    let packet = writer.finish();

    let first_at = HEADER_SIZE;
    let second_at = first_at + 13 + 4;
    assert_eq!(&packet[second_at..second_at + 2], &[0xC0, first_at as u8]);

    let (first, next) = Question::parse(&packet, first_at).unwrap();
    let (second, end) = Question::parse(&packet, next).unwrap();
    assert_eq!(next, second_at);
    assert_eq!(end, packet.len());
    assert_eq!(first.name.as_str(), "example.com");
    assert_eq!(second.name.as_str(), "example.com");
}

#[test]
fn test_self_referential_question() {
    let mut packet = REQ[..HEADER_SIZE].to_vec();
    packet.extend([0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01]);
    assert_eq!(
        Question::parse(&packet, HEADER_SIZE),
        Err(ParseError::PointerLoop(HEADER_SIZE))
    );

    let only_pointer = [0xC0, 0x00];
    assert_eq!(
        Name::parse(&only_pointer, 0),
        Err(ParseError::PointerLoop(0))
    );
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use pretty_hex::pretty_hex;

use waypoint_parser::*;

// example.com A IN, then example.com TXT IN through a pointer
const REQ: &[u8] = &[
    0x12, 0x34, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, b'e', b'x',
    b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01, 0xC0,
    0x0C, 0x00, 0x10, 0x00, 0x01,
];

fn main() {
    let mut header = DnsHeader::parse(REQ, HeaderPolicy::Strict).unwrap();
    let (first, next) = Question::parse(REQ, HEADER_SIZE).unwrap();
    let (second, _) = Question::parse(REQ, next).unwrap();

    // Change some flags
    header.flags.qr = QueryResponse::Response;
    header.flags.aa = AuthoritativeAnswer::Authoritative;
    header.answers = 2;

    let mut writer = MessageWriter::new(&header);
    writer.question(&first).unwrap();
    writer.question(&second).unwrap();
    writer
        .answer(&first.name, first.qtype, first.class, 300, RecordData::Raw(&[127, 0, 0, 1]))
        .unwrap();
    writer
        .answer(&second.name, second.qtype, second.class, 300, RecordData::Txt(b"hello"))
        .unwrap();
    let res = writer.finish();

    println!("=================== Request ===================");
    println!("{}\n", pretty_hex(&REQ));

    println!("=================== Response ===================");
    println!("{}\n", pretty_hex(&res));
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Two questions for the same name, the second one compressed.
pub const REQ: &[u8] = &[
    0x12, 0x34, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
    0x03, b'a', b'p', b'i', 0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o',
    b'm', 0x00, // api.example.com
    0x00, 0x01, 0x00, 0x01, // A IN
    0xC0, 0x0C, // <jump to 12>
    0x00, 0x10, 0x00, 0x01, // TXT IN
];

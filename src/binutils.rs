// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ParseError;

#[inline]
fn safe_read<const N: usize>(buff: &[u8], pos: usize) -> Result<[u8; N], ParseError> {
    let mut bytes = [0u8; N];
    match buff.get(pos..pos + N) {
        Some(buff) => {
            bytes.copy_from_slice(buff);
            Ok(bytes)
        }
        None => Err(ParseError::Truncated(pos)),
    }
}

#[inline]
pub(crate) fn safe_u8_read(buff: &[u8], pos: usize) -> Result<u8, ParseError> {
    buff.get(pos).ok_or(ParseError::Truncated(pos)).map(|n| *n)
}

#[inline]
pub(crate) fn safe_u16_read(buff: &[u8], pos: usize) -> Result<u16, ParseError> {
    let bytes = safe_read::<2>(buff, pos)?;
    Ok(u16::from_be_bytes(bytes))
}

#[inline]
pub(crate) fn safe_slice_read(buff: &[u8], pos: usize, len: usize) -> Result<&[u8], ParseError> {
    buff.get(pos..pos + len).ok_or(ParseError::Truncated(pos))
}

#[inline]
pub(crate) fn push_u16(target: &mut Vec<u8>, n: u16) {
    target.extend(n.to_be_bytes());
}

#[inline]
pub(crate) fn push_u32(target: &mut Vec<u8>, n: u32) {
    target.extend(n.to_be_bytes());
}

#[inline]
pub(crate) fn put_u16(target: &mut [u8], pos: usize, n: u16) {
    target[pos..pos + 2].copy_from_slice(&n.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_big_endian() {
        let buff = [0x12, 0x34, 0x56];
        assert_eq!(safe_u16_read(&buff, 0), Ok(0x1234));
        assert_eq!(safe_u16_read(&buff, 1), Ok(0x3456));
        assert_eq!(safe_u8_read(&buff, 2), Ok(0x56));
    }

    #[test]
    fn out_of_bounds_reads_are_truncated() {
        let buff = [0x12, 0x34, 0x56];
        assert_eq!(safe_u16_read(&buff, 2), Err(ParseError::Truncated(2)));
        assert_eq!(safe_u8_read(&buff, 3), Err(ParseError::Truncated(3)));
        assert_eq!(safe_slice_read(&buff, 1, 3), Err(ParseError::Truncated(1)));
    }

    #[test]
    fn put_overwrites_in_place() {
        let mut buff = vec![0u8; 4];
        put_u16(&mut buff, 2, 0xABCD);
        assert_eq!(buff, [0, 0, 0xAB, 0xCD]);
    }
}

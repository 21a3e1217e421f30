//! Unsigned base-128 varints: seven data bits per byte, least significant
//! group first, with the top bit set on every byte except the last.

use crate::error::{Result, SaveError};

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn encode_to_vec(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    encode(value, &mut out);
    out
}

pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Decodes the varint at the start of `bytes`, returning the value and the
/// number of bytes it occupied. `offset` is the absolute position of
/// `bytes[0]` and is only used to label errors.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        // The tenth byte may only carry the single remaining bit of a u64.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(SaveError::MalformedVarint { offset });
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(SaveError::MalformedVarint { offset })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{MAX_VARINT_LEN, decode, encode_to_vec, encoded_len};
    use crate::error::SaveError;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode_to_vec(0), vec![0x00]);
        assert_eq!(encode_to_vec(5), vec![0x05]);
        assert_eq!(encode_to_vec(127), vec![0x7F]);
        assert_eq!(encode_to_vec(128), vec![0x80, 0x01]);
        assert_eq!(encode_to_vec(300), vec![0xAC, 0x02]);
        assert_eq!(encode_to_vec(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_to_vec(u64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn decode_stops_at_terminating_byte() {
        let (value, used) = decode(&[0xAC, 0x02, 0xFF, 0xFF], 0).expect("varint should decode");
        assert_eq!(value, 300);
        assert_eq!(used, 2);
    }

    #[test]
    fn truncated_continuation_is_malformed() {
        let err = decode(&[0x85], 0x40).expect_err("dangling continuation bit must fail");
        assert_eq!(err, SaveError::MalformedVarint { offset: 0x40 });

        let err = decode(&[], 3).expect_err("empty input must fail");
        assert_eq!(err, SaveError::MalformedVarint { offset: 3 });
    }

    #[test]
    fn overlong_encoding_is_malformed() {
        let bytes = [0xFF; 11];
        assert!(matches!(
            decode(&bytes, 0),
            Err(SaveError::MalformedVarint { offset: 0 })
        ));

        let mut too_wide = vec![0xFF; 9];
        too_wide.push(0x02);
        assert!(decode(&too_wide, 0).is_err());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(value in any::<u64>()) {
            let bytes = encode_to_vec(value);
            prop_assert_eq!(bytes.len(), encoded_len(value));
            prop_assert_eq!(decode(&bytes, 0).unwrap(), (value, bytes.len()));
        }
    }
}

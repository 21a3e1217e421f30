//! CRC-32 (IEEE, reflected, init and xorout `0xFFFFFFFF`) over the save
//! payload, i.e. everything after the header.

use flate2::Crc;

pub fn compute(payload: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(payload);
    crc.sum()
}

//! Minimal binary serialization helpers, in the spirit of the teacher's
//! `Encodeable` trait but fixed to the big-endian wire format the on-disk
//! page layout requires.

use std::io::Read;

pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

pub fn read_exact_vec<R: Read>(reader: &mut R, n: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

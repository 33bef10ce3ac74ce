//! Deterministic gzip compression (C6).
//!
//! `flate2`'s gzip writer never auto-detects an OS byte and writes no
//! filename or mtime field unless explicitly given one, so leaving both
//! unset already satisfies "platform-independent header, OS byte 255
//! (Unknown)" — the only thing this wrapper adds is pinning `mtime(0)` so
//! two runs over identical input bytes produce identical gzip output.

use crate::error::Result;
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::io::Write;

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder: GzEncoder<&mut Vec<u8>> =
            GzBuilder::new().mtime(0).write(&mut buf, Compression::default());
        encoder.write_all(data)?;
        encoder.finish()?;
    }
    Ok(buf)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn os_byte_is_unknown() {
        let compressed = compress(b"hello world").unwrap();
        // Gzip header: ID1 ID2 CM FLG MTIME(4) XFL OS
        assert_eq!(compressed[0], 0x1f);
        assert_eq!(compressed[1], 0x8b);
        assert_eq!(compressed[9], 255, "OS byte must be 255 (unknown)");
    }

    #[test]
    fn identical_input_produces_identical_bytes() {
        let data = vec![42u8; 4096];
        let a = compress(&data).unwrap();
        let b = compress(&data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mtime_field_is_zero() {
        let compressed = compress(b"x").unwrap();
        assert_eq!(&compressed[4..8], &[0, 0, 0, 0]);
    }
}

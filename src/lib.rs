//! # retrocompressor
//!
//! Compress, decompress and measure retro file formats used by the SNES/GBA
//! Donkey Kong Country titles and a handful of related console peripherals:
//! BD, SD, DKCCHR, DKCGBC, DKL, GB-Printer, and the five GBA sub-formats
//! (LZ77, Huffman-20/50/60, RLE) reachable directly or through GBA
//! auto-detection.
//!
//! Every format is driven through [`Format`] and the three dispatcher
//! functions [`compress`], [`decompress`] and [`compressed_size`]; per-format
//! internals live under [`formats`] and share the bit/nibble-level
//! [`bitstream::ByteStream`] and the optimal-parse [`parser::Steps`] engine.
//!
//! DKL tileset data additionally shares a standalone Huffman tree (not one
//! of the [`Format`] tags, since it governs tile blocks rather than a single
//! compressed buffer): see [`formats::dkl_huffman`].
//!
//! ## Buffer example
//!
//! ```rs
//! use retrocompressor::{Format, compress, decompress};
//! let input = b"the quick brown fox jumps over the lazy dog";
//! let packed = compress(Format::Bd, input).expect("compression failed");
//! let unpacked = decompress(Format::Bd, &packed).expect("decompression failed");
//! assert_eq!(unpacked, input);
//! ```

pub mod bitstream;
pub mod dispatcher;
pub mod error;
pub mod formats;
pub mod parser;
mod tools;

pub use dispatcher::{compress, compressed_size, decompress, Format};
pub use error::{get_error, Error, Result};

/// Re-decodes a freshly produced compressed buffer and compares it against
/// the original input, surfacing the `Verify*` error family. Grounded on
/// `dk_comp_lib.c`'s dispatcher, which is the natural home for a self-check
/// that every format can share.
pub fn verify(format: Format, original: &[u8], packed: &[u8]) -> Result<()> {
    let roundtrip = decompress(format, packed).map_err(|_| Error::VerifyDec)?;
    if roundtrip.len() != original.len() {
        return Err(Error::VerifySize);
    }
    if roundtrip != original {
        return Err(Error::VerifyData);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_a_genuine_round_trip() {
        let input = b"the quick brown fox jumps over the lazy dog the quick brown fox";
        let packed = compress(Format::Bd, input).unwrap();
        assert!(verify(Format::Bd, input, &packed).is_ok());
    }

    #[test]
    fn verify_rejects_a_tampered_buffer() {
        let input = b"the quick brown fox jumps over the lazy dog the quick brown fox";
        let mut packed = compress(Format::Bd, input).unwrap();
        // corrupt the first opcode nibble, guaranteed to be read on decode
        // (trailing padding bytes past the terminator are not).
        packed[39] ^= 0xFF;
        assert!(verify(Format::Bd, input, &packed).is_err());
    }
}

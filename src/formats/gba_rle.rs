//! GBA-RLE (type 0x30): run/literal RLE with an 8-flag-free control byte.
//!
//! Grounded in full on `gba_rle.c`.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};
use crate::parser::Steps;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    if input.len() < 5 {
        return Err(Error::InputSmall);
    }
    if input[0] & 0xF0 != 0x30 {
        return Err(Error::SigWrong);
    }
    let output_size = (input[3] as usize) << 16 | input[1] as usize | (input[2] as usize) << 8;

    let mut inp = ByteStream::from_input(input);
    inp.pos = 4;
    let mut out = ByteStream::for_output(output_size);

    while out.pos < output_size {
        let v = inp.read_byte()?;
        if v & 0x80 != 0 {
            let count = (v & 0x7F) as usize + 3;
            let byte = inp.read_byte()?;
            for _ in 0..count {
                out.write_byte(byte)?;
            }
        } else {
            let count = (v & 0x7F) as usize + 1;
            for _ in 0..count {
                let b = inp.read_byte()?;
                out.write_byte(b)?;
            }
        }
    }
    Ok((out.written().to_vec(), inp.consumed()))
}

#[derive(Clone, Copy)]
enum Arg {
    Literal,
    Rle,
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let n = input.len();
    let mut out = ByteStream::for_output(4 + n + n / 64 + 16);
    out.write_byte(0x30)?;
    out.write_byte(n as u8)?;
    out.write_byte((n >> 8) as u8)?;
    out.write_byte((n >> 16) as u8)?;

    let mut steps: Steps<Arg> = Steps::new(n);
    for i in 0..n {
        let limit = 130usize.min(n - i);
        let mut run = 1usize;
        while run < limit && input[i + run] == input[i] {
            run += 1;
        }
        for count in 3..=run {
            steps.propose(i, i + count, 2, 1, Arg::Rle);
        }
        let lit_limit = 128usize.min(n - i);
        for count in 1..=lit_limit {
            steps.propose(i, i + count, (1 + count) as u64, 0, Arg::Literal);
        }
    }

    if !steps.reverse_path() {
        return Err(Error::BadFormat);
    }
    for (from, to, _case, arg) in steps.walk() {
        let count = to - from;
        match arg {
            Arg::Rle => {
                out.write_byte(0x80 | (count - 3) as u8)?;
                out.write_byte(input[from])?;
            }
            Arg::Literal => {
                out.write_byte((count - 1) as u8)?;
                for &b in &input[from..to] {
                    out.write_byte(b)?;
                }
            }
        }
    }
    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rle_0x30_smoke() {
        let input = vec![0xAAu8; 0x1000];
        let compressed = compress(&input).unwrap();
        assert_eq!(&compressed[..4], &[0x30, 0x00, 0x10, 0x00]);
        assert_eq!(&compressed[4..6], &[0xFF, 0xAA]); // run of 130 (the encodable max): 0x80 | (130-3)
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn round_trips_mixed() {
        let input = b"aaaaaaaaabbbbbbccccccccccccccccccccccccccdefg".to_vec();
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }
}

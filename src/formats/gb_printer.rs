//! GB-Printer: fixed-length RLE over exactly 0x280-byte blocks.
//!
//! Grounded in full on `gb_printer.c`.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};
use crate::parser::Steps;

const CHUNK: usize = 0x280;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut inp = ByteStream::from_input(input);
    let mut out = ByteStream::for_output(CHUNK);
    while inp.pos < inp.length && out.pos < CHUNK {
        let a = inp.read_byte()?;
        if a & 0x80 != 0 {
            let count = (a & 0x7F) as usize + 2;
            let byte = inp.read_byte()?;
            for _ in 0..count {
                if out.pos >= CHUNK {
                    break;
                }
                out.write_byte(byte)?;
            }
        } else {
            let count = (a & 0x7F) as usize + 1;
            for _ in 0..count {
                if out.pos >= CHUNK {
                    break;
                }
                let b = inp.read_byte()?;
                out.write_byte(b)?;
            }
        }
    }
    Ok((out.written().to_vec(), inp.consumed()))
}

#[derive(Clone, Copy)]
enum Arg {
    Raw,
    Rle,
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < CHUNK {
        return Err(Error::InputSmall);
    }
    if input.len() > CHUNK {
        return Err(Error::InputLarge);
    }
    let n = input.len();
    let mut steps: Steps<Arg> = Steps::new(n);
    for i in 0..n {
        let raw_limit = 0x80usize.min(n - i);
        for count in 1..=raw_limit {
            steps.propose(i, i + count, (1 + count) as u64, 0, Arg::Raw);
        }
        let rle_limit = 0x82usize.min(n - i);
        for count in 2..=rle_limit {
            if input[i] != input[i + count - 1] {
                break;
            }
            steps.propose(i, i + count, 2, 1, Arg::Rle);
        }
    }
    if !steps.reverse_path() {
        return Err(Error::BadFormat);
    }

    let mut out = ByteStream::for_output(n + n / 64 + 8);
    for (from, to, _case, arg) in steps.walk() {
        let count = to - from;
        match arg {
            Arg::Rle => {
                out.write_byte(0x80 | (count - 2) as u8)?;
                out.write_byte(input[from])?;
            }
            Arg::Raw => {
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
    fn rejects_wrong_chunk_size() {
        assert_eq!(compress(&[0u8; 10]), Err(Error::InputSmall));
        assert_eq!(compress(&[0u8; CHUNK + 1]), Err(Error::InputLarge));
    }

    #[test]
    fn round_trips_a_full_chunk() {
        let mut input = vec![0u8; CHUNK];
        for (i, b) in input.iter_mut().enumerate() {
            *b = (i % 7) as u8;
        }
        for b in input.iter_mut().take(32).skip(16) {
            *b = 0x42;
        }
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }
}

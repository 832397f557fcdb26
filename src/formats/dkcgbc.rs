//! DKCGBC: 4-case tilemap codec (8-bit window), terminated by a zero control byte.
//!
//! Grounded in full on `dkcgbc_decomp_core.c` (decoder) and its adjoining
//! "copy/pasted from DKC SNES" compressor using the shared `OptimalParser`.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};
use crate::parser::Steps;

const WINDOW: usize = 255;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut inp = ByteStream::from_input(input);
    let mut out = ByteStream::for_output(1 << 16);
    loop {
        let n = inp.read_byte()?;
        if n == 0 {
            break;
        }
        match n >> 6 {
            2 => {
                let count = (n & 0x3F) as usize;
                for _ in 0..count {
                    let v = inp.read_byte()?;
                    out.write_byte(v)?;
                }
            }
            3 => {
                let count = (n & 0x3F) as usize;
                let dist = inp.read_byte()? as usize;
                for _ in 0..count {
                    let v = out.read_back(dist)?;
                    out.write_byte(v)?;
                }
            }
            _ => {
                let count = n as usize; // 1..127, raw count, not masked
                let v = inp.read_byte()?;
                for _ in 0..count {
                    out.write_byte(v)?;
                }
            }
        }
    }
    Ok((out.written().to_vec(), inp.consumed()))
}

#[derive(Clone, Copy)]
enum Arg {
    Rle,
    CopyIn,
    CopyOut { dist: u8 },
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let n = input.len();
    let mut steps: Steps<Arg> = Steps::new(n);
    for i in 0..n {
        // RLE: byte repeated, count in 1..127
        let rle_limit = 127usize.min(n - i);
        let mut run = 1usize;
        while run < rle_limit && input[i + run] == input[i] {
            run += 1;
        }
        for count in 1..=run {
            steps.propose(i, i + count, 2, 0, Arg::Rle);
        }

        // raw copy from input: count in 1..63
        let copy_limit = 63usize.min(n - i);
        for count in 1..=copy_limit {
            steps.propose(i, i + count, (1 + count) as u64, 1, Arg::CopyIn);
        }

        // backref into already-written output: count in 2..63, window 255
        let window_start = i.saturating_sub(WINDOW);
        let back_limit = 63usize.min(n - i);
        let mut best: Option<(usize, usize)> = None; // (match_len, dist)
        for j in window_start..i {
            let mut matched = 0;
            while matched < back_limit && input[i + matched] == input[j + matched] {
                matched += 1;
            }
            if best.map_or(true, |(m, _)| matched > m) {
                best = Some((matched, i - j));
            }
            if matched == back_limit {
                break;
            }
        }
        if let Some((matched, dist)) = best {
            for count in 2..=matched {
                steps.propose(i, i + count, 2, 2, Arg::CopyOut { dist: dist as u8 });
            }
        }
    }
    if !steps.reverse_path() {
        return Err(Error::BadFormat);
    }

    let mut out = ByteStream::for_output(n + n / 32 + 8);
    for (from, to, _case, arg) in steps.walk() {
        let count = to - from;
        match arg {
            Arg::Rle => {
                out.write_byte(count as u8)?;
                out.write_byte(input[from])?;
            }
            Arg::CopyIn => {
                out.write_byte(0x80 | count as u8)?;
                for &b in &input[from..to] {
                    out.write_byte(b)?;
                }
            }
            Arg::CopyOut { dist } => {
                out.write_byte(0xC0 | count as u8)?;
                out.write_byte(dist)?;
            }
        }
    }
    out.write_byte(0)?;
    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for input in [&b"aaaaaaaaabbbbbbbbbbccccccc"[..], b"tilemap tilemap data data", &[7u8; 200]] {
            let c = compress(input).unwrap();
            let d = decompress(&c).unwrap();
            assert_eq!(d, input);
        }
    }
}

//! SD: bit-packed word-oriented codec with four optional sub-streams plus a
//! mandatory main loop.
//!
//! Grounded in full on `sd_decomp_core.c`.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};

/// Read `count` bits MSB-first from `s`, building a value big-endian.
fn bits(s: &mut ByteStream, count: u32) -> Result<u32> {
    let mut val = 0u32;
    for _ in 0..count {
        if s.pos >= s.length {
            return Err(Error::OobInput);
        }
        let bit = (s.data[s.pos] >> (s.bit_pos ^ 7)) & 1;
        val = (val << 1) | bit as u32;
        s.bit_pos += 1;
        if s.bit_pos == 8 {
            s.bit_pos = 0;
            s.pos += 1;
        }
    }
    Ok(val)
}

fn write_bits(s: &mut ByteStream, val: u32, count: u32) -> Result<()> {
    for k in (0..count).rev() {
        let bit = ((val >> k) & 1) as u8;
        if s.pos >= s.limit {
            return Err(Error::OobOutputWrite);
        }
        if bit != 0 {
            s.data[s.pos] |= 1 << (s.bit_pos ^ 7);
        }
        s.bit_pos += 1;
        if s.bit_pos == 8 {
            s.bit_pos = 0;
            s.pos += 1;
        }
    }
    Ok(())
}

fn flush_bits(s: &mut ByteStream) {
    if s.bit_pos != 0 {
        s.bit_pos = 0;
        s.pos += 1;
    }
}

/// OR a 10-bit value into word `addr` (word index, not byte offset).
fn mw(out: &mut [u16], addr: usize, val: u16) -> Result<()> {
    if addr >= out.len() {
        return Err(Error::OobOutputWrite);
    }
    out[addr] |= val;
    Ok(())
}

fn sub_decompress(inp: &mut ByteStream, out: &mut [u16], mode: u32) -> Result<()> {
    let (val_size, count_size, shift) = if mode == 3 {
        (3u32, 4u32, 10u32)
    } else {
        (1u32, 6u32, 13 + mode)
    };
    let mut addr = 0usize;
    loop {
        let loop_flag = bits(inp, 1)?;
        let mut val = bits(inp, val_size)?;
        val <<= shift;
        let count = if loop_flag != 0 { bits(inp, count_size)? } else { 1 };
        if count == 0 {
            break;
        }
        for _ in 0..count {
            mw(out, addr, val as u16)?;
            addr += 1;
        }
    }
    Ok(())
}

fn main_decompress(inp: &mut ByteStream, out: &mut [u16]) -> Result<()> {
    let mut addr = 0usize;
    loop {
        let mode = bits(inp, 2)?;
        let mut val = bits(inp, 10)? as u16;
        let count = match mode {
            0 => 1,
            1 => {
                let c = bits(inp, 6)?;
                if c == 0 {
                    break;
                }
                c
            }
            _ => {
                let c = bits(inp, 4)?;
                if c == 0 {
                    return Err(Error::SdBadExit);
                }
                c
            }
        };
        for _ in 0..count {
            mw(out, addr, val)?;
            addr += 1;
            match mode {
                2 => val = val.wrapping_add(1) & 0x3FF,
                3 => val = val.wrapping_sub(1) & 0x3FF,
                _ => {}
            }
        }
    }
    Ok(())
}

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    if input.len() < 3 {
        return Err(Error::InputSmall);
    }
    let subs = input[0] & 7;
    let word_count = (input[1] as usize) | (input[2] as usize) << 8;

    let mut inp = ByteStream::from_input(input);
    inp.pos = 3;
    let mut words = vec![0u16; word_count];

    for mode in 0..3u32 {
        if subs & (1 << mode) != 0 {
            sub_decompress(&mut inp, &mut words, mode)?;
        }
    }
    sub_decompress(&mut inp, &mut words, 3)?;
    main_decompress(&mut inp, &mut words)?;

    let mut out = Vec::with_capacity(word_count * 2);
    for w in words {
        out.push(w as u8);
        out.push((w >> 8) as u8);
    }
    Ok((out, inp.consumed()))
}

/// Encode one sub-stream (optional mode 0..2 or the mandatory mode 3) as a
/// sequence of (value, run-length) pairs over `words`, terminated by a
/// zero-count pair, mirroring `sub_decompress`'s field widths exactly.
fn encode_substream(out: &mut ByteStream, words: &[u16], mode: u32) -> Result<()> {
    let (val_size, count_size, shift) = if mode == 3 { (3u32, 4u32, 10u32) } else { (1u32, 6u32, 13 + mode) };
    let max_count = (1usize << count_size) - 1;
    let mask = (1u32 << val_size) - 1;
    let n = words.len();

    let mut i = 0usize;
    while i < n {
        let val = (words[i] as u32 >> shift) & mask;
        let mut run = 1usize;
        while run < n - i && run < max_count && (words[i + run] as u32 >> shift) & mask == val {
            run += 1;
        }
        write_bits(out, 1, 1)?; // loop flag set: count follows
        write_bits(out, val, val_size)?;
        write_bits(out, run as u32, count_size)?;
        i += run;
    }
    write_bits(out, 0, 1)?; // loop flag
    write_bits(out, 0, val_size)?;
    write_bits(out, 0, count_size)?; // terminator: count 0
    Ok(())
}

/// Encode a run of words via whichever sub-stream or main-stream grouping is
/// cheapest at each position. Bits 13-15 of every word are only
/// representable through the three optional sub-streams (`sub_decompress`'s
/// modes 0-2, shift = 13+mode): each is enabled in the header and emitted
/// whenever any word carries that bit, alongside the always-present
/// mandatory sub-stream (mode 3, bits 0x1C00) and the main stream.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() % 2 != 0 {
        return Err(Error::InputSmall);
    }
    let words: Vec<u16> = input.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    let n = words.len();

    let mut subs = 0u8;
    for mode in 0..3u32 {
        if words.iter().any(|&w| (w >> (13 + mode)) & 1 != 0) {
            subs |= 1 << mode;
        }
    }
    log::debug!("sd: encoding {} words, optional sub-streams mask={:#05b}", n, subs);

    let mut out = ByteStream::for_output(3 + n * 3 + 16);
    out.write_byte(subs)?;
    out.write_word_le(n as u16)?;

    for mode in 0..3u32 {
        if subs & (1 << mode) != 0 {
            encode_substream(&mut out, &words, mode)?;
        }
    }

    // mandatory sub-stream: encode the high 3 bits (0x1C00) of every word,
    // matching sub_decompress(mode=3)'s val_size=3,count_size=4,shift=10.
    encode_substream(&mut out, &words, 3)?;

    // main stream: low 10 bits, using mode 0 (unique) or mode 1 (same) runs.
    let mut i = 0usize;
    while i < n {
        let lo = words[i] & 0x3FF;
        let mut run = 1usize;
        while run < n - i && run < 63 && (words[i + run] & 0x3FF) == lo {
            run += 1;
        }
        if run == 1 {
            write_bits(&mut out, 0, 2)?;
            write_bits(&mut out, lo as u32, 10)?;
        } else {
            write_bits(&mut out, 1, 2)?;
            write_bits(&mut out, lo as u32, 10)?;
            write_bits(&mut out, run as u32, 6)?;
        }
        i += run;
    }
    write_bits(&mut out, 1, 2)?; // mode 1 (same)
    write_bits(&mut out, 0, 10)?;
    write_bits(&mut out, 0, 6)?; // terminator: count 0

    flush_bits(&mut out);
    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let words: Vec<u16> = vec![0, 0, 0, 1, 1, 1, 1, 0x3FF, 5, 5, 5, 5, 5];
        let mut input = vec![];
        for w in &words {
            input.push(*w as u8);
            input.push((*w >> 8) as u8);
        }
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn high_bits_round_trip_through_optional_sub_streams() {
        // words touching all three optional planes (bits 13, 14, 15), not
        // just the mandatory 0x1C00 group.
        let words: Vec<u16> = vec![0xFFFF, 0xFFFF, 0x8000, 0x4000, 0x2000, 0, 0, 0x6000];
        let mut input = vec![];
        for w in &words {
            input.push(*w as u8);
            input.push((*w >> 8) as u8);
        }
        let c = compress(&input).unwrap();
        assert_ne!(c[0] & 7, 0, "optional sub-stream mask must be set for high-bit words");
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn every_loop_mode_advances_by_its_count() {
        let words: Vec<u16> = (0..40).map(|i| if i < 20 { 3 } else { 7 }).collect();
        let mut input = vec![];
        for w in &words {
            input.push(*w as u8);
            input.push((*w >> 8) as u8);
        }
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }
}

//! BD: the SNES DKC2/DKC3 "big data" codec. A 16-case half-byte-opcode
//! format combining literal copies, input/constant RLE, three window
//! widths, a 16-slot recent-word cache, and an up-front constant table
//! that six of the sixteen cases reference by short index.
//!
//! Grounded in full on `bd_decomp_core.c` (decoder, and therefore the
//! authoritative wire format) and `bd_comp_core.c` (the two-pass constant
//! selection this encoder reproduces the intent of, using the shared
//! nibble-cost `OptimalParser` instead of the original's per-step
//! bytes-per-byte ratio search — see DESIGN.md).

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};
use crate::parser::Steps;
use std::collections::HashMap;

/// Header byte count before the body: 1 unused byte + 2 RLE bytes +
/// 2 byte constants + 17 word constants (34 bytes) = 39.
const TABLE_LEN: usize = 39;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed
/// (`dk_compressed_size_*`'s notion of "compressed size").
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    if input.len() < TABLE_LEN {
        return Err(Error::InputSmall);
    }
    let mut inp = ByteStream::from_input(input);
    inp.pos = TABLE_LEN;
    let mut out = ByteStream::for_output(1 << 16);

    loop {
        let c = inp.read_nibble()?;
        match c {
            0 => {
                let n = inp.read_nibble()? as usize;
                if n == 0 {
                    break;
                }
                for _ in 0..n {
                    let b = inp.read_nibble_byte()?;
                    out.write_byte(b)?;
                }
            }
            2 => {
                let b = inp.read_nibble_byte()?;
                out.write_byte(b)?;
                let b = inp.read_nibble_byte()?;
                out.write_byte(b)?;
            }
            1 => {
                let b = inp.read_nibble_byte()?;
                out.write_byte(b)?;
            }
            3 => {
                let n = inp.read_nibble()? as usize + 3;
                let b = inp.read_nibble_byte()?;
                for _ in 0..n {
                    out.write_byte(b)?;
                }
            }
            4 | 5 => {
                let n = inp.read_nibble()? as usize + 3;
                let b = input[1 + (c as usize & 1)];
                for _ in 0..n {
                    out.write_byte(b)?;
                }
            }
            6 => {
                out.write_byte(input[5])?;
                out.write_byte(input[6])?;
            }
            7 | 8 => {
                let b = input[3 + ((c as usize ^ 1) & 1)];
                out.write_byte(b)?;
            }
            9 => {
                let dist = inp.read_nibble()? as usize + 2;
                let b = out.read_back(dist)?;
                out.write_byte(b)?;
                let b = out.read_back(dist)?;
                out.write_byte(b)?;
            }
            10 => {
                let n = inp.read_nibble()? as usize + 3;
                let addr = inp.read_byte()? as usize + n;
                for _ in 0..n {
                    let b = out.read_back(addr)?;
                    out.write_byte(b)?;
                }
            }
            11 => {
                let n = inp.read_nibble()? as usize + 3;
                let hi = inp.read_byte()? as usize;
                let lo = inp.read_nibble()? as usize;
                let addr = (hi << 4 | lo) + 0x103;
                for _ in 0..n {
                    let b = out.read_back(addr)?;
                    out.write_byte(b)?;
                }
            }
            12 => {
                let n = inp.read_nibble()? as usize + 3;
                let hi = inp.read_byte()? as usize;
                let lo = inp.read_byte()? as usize;
                let addr = hi << 8 | lo;
                for _ in 0..n {
                    let b = out.read_back(addr)?;
                    out.write_byte(b)?;
                }
            }
            13 => {
                let b = out.read_back(1)?;
                out.write_byte(b)?;
            }
            14 => {
                let b = out.read_back(2)?;
                out.write_byte(b)?;
                let b = out.read_back(2)?;
                out.write_byte(b)?;
            }
            15 => {
                let idx = inp.read_nibble()? as usize;
                let addr = idx * 2 + 7;
                out.write_byte(input[addr])?;
                out.write_byte(input[addr + 1])?;
            }
            _ => unreachable!("nibble is 4 bits"),
        }
    }
    Ok((out.written().to_vec(), inp.consumed()))
}

#[derive(Clone, Copy)]
enum Arg {
    CopyIn,
    Byte,
    Word,
    RleInput,
    RleConst0,
    RleConst1,
    WordConst,
    ByteConst0,
    ByteConst1,
    RecentWord { dist: u8 },
    Win8 { addr: u16 },
    Win12 { addr: u16 },
    Win16 { addr: u16 },
    RepeatByte,
    RepeatWord,
    WordLut { index: u8 },
}

/// A codec context: the emitted output plus whatever constant values are
/// currently visible to constant-bearing cases (empty on the first pass).
struct Constants {
    rle: [Option<u8>; 2],
    byte: [Option<u8>; 2],
    word0: Option<u16>,
    wlut: Vec<u16>, // up to 16 entries, case 15
}

impl Constants {
    fn none() -> Self {
        Constants { rle: [None; 2], byte: [None; 2], word0: None, wlut: vec![] }
    }
}

/// Propose every non-constant-case edge from position `i`. Shared by both
/// parser passes; the second pass additionally proposes constant-case
/// edges via `propose_constants`.
fn propose_plain(steps: &mut Steps<Arg>, input: &[u8], i: usize) {
    let n = input.len();

    // case 1 / case 2: literal byte or word
    steps.propose(i, i + 1, 3, 1, Arg::Byte);
    if n - i >= 2 {
        steps.propose(i, i + 2, 5, 2, Arg::Word);
    }

    // case 0: literal run, count 1..15
    let run_limit = 15usize.min(n - i);
    for count in 1..=run_limit {
        steps.propose(i, i + count, (2 + 2 * count) as u64, 0, Arg::CopyIn);
    }

    // case 3: RLE on an input-supplied byte, count 3..18
    {
        let limit = 18usize.min(n - i);
        let mut run = 1usize;
        while run < limit && input[i + run] == input[i] {
            run += 1;
        }
        for count in 3..=run {
            steps.propose(i, i + count, 4, 3, Arg::RleInput);
        }
    }

    // case 9: recent-word reference, distance 2..17 words back (2 bytes)
    if n - i >= 2 {
        let max_dist = 17usize.min(i);
        for dist in 2..=max_dist {
            if out_matches_word(input, i, dist) {
                steps.propose(i, i + 2, 2, 9, Arg::RecentWord { dist: dist as u8 });
            }
        }
    }

    // case 13 / 14: repeat the immediately preceding byte/word
    if i > 0 && input[i] == input[i - 1] {
        steps.propose(i, i + 1, 1, 13, Arg::RepeatByte);
    }
    if i > 1 && n - i >= 2 && input[i] == input[i - 2] && input[i + 1] == input[i - 1] {
        steps.propose(i, i + 2, 1, 14, Arg::RepeatWord);
    }

    // cases 10/11/12: windowed backreferences, widths chosen by distance.
    // Case 10's stored address is `dist - len` (recomputed per edge length
    // at emission time), so the *detection*-time guard must hold for the
    // longest candidate length too: `dist + matched < 256`, matching
    // `bd_comp_core.c`'s `pos+k<256` condition on the 8-bit window.
    {
        let mut best8: Option<(usize, usize)> = None; // (len, dist)
        let mut best12: Option<(usize, usize)> = None; // 259..=4354
        let mut best16: Option<(usize, usize)> = None; // any
        let max_len = 18usize.min(n - i);
        for j in 0..i {
            let dist = i - j;
            let mut matched = 0usize;
            while matched < max_len && input[i + matched] == input[j + matched] {
                matched += 1;
            }
            if matched < 3 {
                continue;
            }
            // the 8-bit window's stored address is `dist - len`, so the
            // candidate length must never exceed `dist` (mirroring
            // `bd_comp_core.c`'s `if (pos < j) j = pos;`), or the address
            // underflows.
            let matched8 = matched.min(dist);
            if matched8 >= 3 && dist + matched8 < 256 && best8.map_or(true, |(m, _)| matched8 > m) {
                best8 = Some((matched8, dist));
            }
            if (259..=4354).contains(&dist) && best12.map_or(true, |(m, _)| matched > m) {
                best12 = Some((matched, dist));
            }
            if dist <= 0xFFFF && best16.map_or(true, |(m, _)| matched > m) {
                best16 = Some((matched, dist));
            }
        }
        if let Some((matched, dist)) = best8 {
            for count in 3..=matched {
                steps.propose(i, i + count, 4, 10, Arg::Win8 { addr: dist as u16 });
            }
        }
        if let Some((matched, dist)) = best12 {
            for count in 3..=matched {
                steps.propose(i, i + count, 5, 11, Arg::Win12 { addr: dist as u16 });
            }
        }
        if let Some((matched, dist)) = best16 {
            for count in 3..=matched {
                steps.propose(i, i + count, 6, 12, Arg::Win16 { addr: dist as u16 });
            }
        }
    }
}

/// True when the two bytes at `i..i+2` equal the two bytes `dist` words
/// (well, `dist` positions back, matching case 9's "recent word" framing)
/// that already emitted through the earlier portion of the input.
fn out_matches_word(input: &[u8], i: usize, dist: usize) -> bool {
    i >= dist && input[i] == input[i - dist] && input[i + 1] == input[i - dist + 1]
}

fn propose_constants(steps: &mut Steps<Arg>, input: &[u8], i: usize, k: &Constants) {
    let n = input.len();

    // cases 4/5: RLE against a constant byte, count 3..18
    if let Some(b0) = k.rle[0] {
        if input[i] == b0 {
            let limit = 18usize.min(n - i);
            let mut run = 1usize;
            while run < limit && input[i + run] == b0 {
                run += 1;
            }
            for count in 3..=run {
                steps.propose(i, i + count, 2, 4, Arg::RleConst0);
            }
        }
    }
    if let Some(b1) = k.rle[1] {
        if input[i] == b1 {
            let limit = 18usize.min(n - i);
            let mut run = 1usize;
            while run < limit && input[i + run] == b1 {
                run += 1;
            }
            for count in 3..=run {
                steps.propose(i, i + count, 2, 5, Arg::RleConst1);
            }
        }
    }

    // case 6: the dedicated word constant
    if let Some(w0) = k.word0 {
        if n - i >= 2 && (input[i] as u16) << 8 | input[i + 1] as u16 == w0 {
            steps.propose(i, i + 2, 1, 6, Arg::WordConst);
        }
    }

    // cases 7/8: byte constants
    if let Some(b0) = k.byte[0] {
        if input[i] == b0 {
            steps.propose(i, i + 1, 1, 7, Arg::ByteConst0);
        }
    }
    if let Some(b1) = k.byte[1] {
        if input[i] == b1 {
            steps.propose(i, i + 1, 1, 8, Arg::ByteConst1);
        }
    }

    // case 15: word LUT, 16 entries
    if n - i >= 2 {
        let word = (input[i] as u16) << 8 | input[i + 1] as u16;
        if let Some(idx) = k.wlut.iter().position(|&w| w == word) {
            steps.propose(i, i + 2, 2, 15, Arg::WordLut { index: idx as u8 });
        }
    }
}

/// Sort `(value, count)` pairs most-frequent first, ties broken toward the
/// lower value (stable, matching the reference's deterministic tie-break).
fn sort_by_count<T: Copy + Ord>(mut entries: Vec<(T, u64)>) -> Vec<(T, u64)> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    entries
}

/// Count byte and word frequencies over the literal/copy regions (cases
/// 0,1,2) and RLE-byte frequencies over runs of length >= 3 (case 3),
/// exactly the windows `bd_comp_core.c`'s `choose_constants` scans.
fn gather_constant_candidates(input: &[u8], steps: &Steps<Arg>) -> (Vec<(u8, u64)>, Vec<(u8, u64)>, Vec<(u16, u64)>) {
    let mut rle_counts: HashMap<u8, u64> = HashMap::new();
    let mut byte_counts: HashMap<u8, u64> = HashMap::new();
    let mut word_counts: HashMap<u16, u64> = HashMap::new();

    for (from, to, case, _arg) in steps.walk() {
        match case {
            0 => {
                let run = &input[from..to];
                for &b in run {
                    *byte_counts.entry(b).or_insert(0) += 1;
                }
                for w in run.windows(2) {
                    let word = (w[0] as u16) << 8 | w[1] as u16;
                    *word_counts.entry(word).or_insert(0) += 1;
                }
            }
            2 => {
                let word = (input[from] as u16) << 8 | input[from + 1] as u16;
                *word_counts.entry(word).or_insert(0) += 1;
                *byte_counts.entry(input[from + 1]).or_insert(0) += 1;
            }
            1 => {
                *byte_counts.entry(input[from]).or_insert(0) += 1;
            }
            3 => {
                *rle_counts.entry(input[from]).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    (
        sort_by_count(rle_counts.into_iter().collect()),
        sort_by_count(byte_counts.into_iter().collect()),
        sort_by_count(word_counts.into_iter().collect()),
    )
}

/// Build the constant table from the frequency tables gathered over the
/// first (non-constant) pass, applying the forbidden-overlap filter: a
/// word candidate whose two halves are both in `{byte0, byte1}` is
/// unrepresentable-but-redundant and is dropped before re-sorting.
fn choose_constants(rle: &[(u8, u64)], byte: &[(u8, u64)], word: &[(u16, u64)]) -> Constants {
    let rle0 = rle.first().map(|&(b, _)| b);
    let rle1 = rle.get(1).map(|&(b, _)| b);
    let byte0 = byte.first().map(|&(b, _)| b);
    let byte1 = byte.get(1).map(|&(b, _)| b);

    let forbidden = |w: u16| -> bool {
        let hi = (w >> 8) as u8;
        let lo = w as u8;
        let in_set = |b: u8| Some(b) == byte0 || Some(b) == byte1;
        in_set(hi) && in_set(lo)
    };

    let mut filtered: Vec<(u16, u64)> = word.iter().copied().filter(|&(w, _)| !forbidden(w)).collect();
    filtered = sort_by_count(filtered.into_iter().take(21).collect());
    let top17: Vec<u16> = filtered.into_iter().take(17).map(|(w, _)| w).collect();

    Constants {
        rle: [rle0, rle1],
        byte: [byte0, byte1],
        word0: top17.first().copied(),
        wlut: top17.into_iter().skip(1).collect(),
    }
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let n = input.len();
    log::debug!("bd: first pass over {} bytes, no constant table yet", n);

    // first parse: only the non-constant cases are reachable, since no
    // constant table exists yet.
    let mut steps: Steps<Arg> = Steps::new(n);
    for i in 0..n {
        propose_plain(&mut steps, input, i);
    }
    if !steps.reverse_path() {
        return Err(Error::BadFormat);
    }

    let (rle, byte, word) = gather_constant_candidates(input, &steps);
    let consts = choose_constants(&rle, &byte, &word);
    log::debug!(
        "bd: constants chosen, rle={:?} byte={:?} word0={:?} wlut_len={}",
        consts.rle,
        consts.byte,
        consts.word0,
        consts.wlut.len()
    );

    // second parse: every case is reachable now that constants are known.
    let mut steps: Steps<Arg> = Steps::new(n);
    for i in 0..n {
        propose_plain(&mut steps, input, i);
        propose_constants(&mut steps, input, i, &consts);
    }
    if !steps.reverse_path() {
        return Err(Error::BadFormat);
    }

    let mut out = ByteStream::for_output(n * 2 + 256);
    out.write_byte(0)?; // unused placeholder byte
    out.write_byte(consts.rle[0].unwrap_or(0))?;
    out.write_byte(consts.rle[1].unwrap_or(0))?;
    out.write_byte(consts.byte[0].unwrap_or(0))?;
    out.write_byte(consts.byte[1].unwrap_or(0))?;
    let word0 = consts.word0.unwrap_or(0);
    out.write_byte((word0 >> 8) as u8)?;
    out.write_byte(word0 as u8)?;
    for slot in 0..16 {
        let w = consts.wlut.get(slot).copied().unwrap_or(0);
        out.write_byte((w >> 8) as u8)?;
        out.write_byte(w as u8)?;
    }
    debug_assert_eq!(out.pos, TABLE_LEN);

    for (from, to, case, arg) in steps.walk() {
        let count = to - from;
        out.write_nibble(case)?;
        match arg {
            Arg::CopyIn => {
                out.write_nibble(count as u8)?;
                for &b in &input[from..to] {
                    out.write_nibble_byte(b)?;
                }
            }
            Arg::Byte => out.write_nibble_byte(input[from])?,
            Arg::Word => {
                out.write_nibble_byte(input[from])?;
                out.write_nibble_byte(input[from + 1])?;
            }
            Arg::RleInput => {
                out.write_nibble((count - 3) as u8)?;
                out.write_nibble_byte(input[from])?;
            }
            Arg::RleConst0 | Arg::RleConst1 => {
                out.write_nibble((count - 3) as u8)?;
            }
            Arg::WordConst | Arg::ByteConst0 | Arg::ByteConst1 | Arg::RepeatByte | Arg::RepeatWord => {}
            Arg::RecentWord { dist } => out.write_nibble(dist - 2)?,
            Arg::Win8 { addr } => {
                out.write_nibble((count - 3) as u8)?;
                out.write_byte((addr as usize - count) as u8)?;
            }
            Arg::Win12 { addr } => {
                let raw = addr as usize - 0x103;
                out.write_nibble((count - 3) as u8)?;
                out.write_byte((raw >> 4) as u8)?;
                out.write_nibble((raw & 0xF) as u8)?;
            }
            Arg::Win16 { addr } => {
                out.write_nibble((count - 3) as u8)?;
                out.write_byte((addr >> 8) as u8)?;
                out.write_byte(addr as u8)?;
            }
            Arg::WordLut { index } => out.write_nibble(index)?,
        }
    }
    out.pad_nibble()?;
    out.write_nibble_byte(0)?; // terminator: case 0, length 0
    out.pad_nibble()?;

    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_input_round_trips_via_rle_constant() {
        let input = vec![0x55u8; 4096];
        let c = compress(&input).unwrap();
        assert_eq!(c[1], 0x55, "top RLE constant slot should pick the only byte present");
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn round_trips_mixed_text() {
        let input = b"the quick brown fox jumps over the lazy dog the quick brown fox";
        let c = compress(input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input.to_vec());
    }

    #[test]
    fn round_trips_with_long_range_backreference() {
        let mut input = vec![0u8; 5000];
        for (i, b) in input.iter_mut().enumerate().take(300) {
            *b = (i % 251) as u8;
        }
        for i in 300..5000 {
            input[i] = input[i - 300];
        }
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn round_trips_short_period_repeat_within_8_bit_window() {
        // period-3 content with a short in-window distance (3) stresses the
        // 8-bit window candidate: a naive match length of 18 here would
        // exceed dist=3, underflowing the stored `addr - count` address.
        let mut input = Vec::new();
        while input.len() < 60 {
            input.extend_from_slice(b"ABC");
        }
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn empty_input_round_trips() {
        let c = compress(&[]).unwrap();
        let d = decompress(&c).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn forbidden_overlap_excludes_word_built_from_both_byte_constants() {
        // 0xAA and 0xBB are the clear top two byte candidates; 0xAABB is
        // the clear top word candidate, but it's built entirely from
        // those two bytes, so it must be dropped in favor of the next
        // candidate even though it has the highest raw count.
        let rle: Vec<(u8, u64)> = vec![];
        let byte = vec![(0xAAu8, 50u64), (0xBBu8, 40u64), (0xCCu8, 5u64)];
        let word = vec![(0xAABBu16, 60u64), (0x1234u16, 10u64), (0xAACCu16, 3u64)];
        let consts = choose_constants(&rle, &byte, &word);
        assert_eq!(consts.byte, [Some(0xAA), Some(0xBB)]);
        assert_eq!(consts.word0, Some(0x1234));
        assert!(!consts.wlut.contains(&0xAABB));
    }

    #[test]
    fn round_trips_with_many_repeated_constant_bytes() {
        // a pattern dominated by a two-byte alternation exercises both
        // the recent-word case and the constant table together.
        let mut input = Vec::new();
        for _ in 0..40 {
            input.push(0xAA);
            input.push(0xBB);
        }
        input.extend_from_slice(b"distinct tail content to keep the parse honest");
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }
}

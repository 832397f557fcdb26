//! GBA-Huff20 (type 0x20): the GBA BIOS Huffman format, an 8-bit-leaf static
//! tree packed into a 6-bit node-offset table so the BIOS decoder can follow
//! it with a single byte fetch per step.
//!
//! Grounded in full on `gbahuff20.c`. Data is read/written as 32-bit
//! big-endian bit groups (`ByteStream::read_bit_be32`/`write_bit_be32`),
//! matching the BIOS's own bit addressing.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};
use crate::tools::huffman_tree::{build, path_to_root, set_parents, TreeNode};

const STACK_LIMIT: usize = 8;
const NODE_LIMIT: usize = 128;
const AGE_THRESHOLD: i64 = 125;

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    if input.len() < 6 {
        return Err(Error::EarlyEof);
    }
    if input[0] & 0xF0 != 0x20 {
        return Err(Error::SigWrong);
    }
    let data_size = input[0] & 0x0F;
    if data_size == 0 || data_size > 8 {
        return Err(Error::HuffWrong);
    }
    if data_size != 8 {
        return Err(Error::HuffLeaf);
    }
    let output_size = input[1] as usize | (input[2] as usize) << 8 | (input[3] as usize) << 16;
    let data_offset = 4 + 2 * (input[4] as usize + 1);

    let mut inp = ByteStream::from_input(input);
    inp.pos = data_offset;

    let mut out = Vec::with_capacity(output_size);
    let mut n: usize = 0;
    let mut node: u8 = 0;
    while out.len() < output_size {
        let dir = inp.read_bit_be32()?;
        let is_leaf_next = (dir == 0 && node & 0x80 != 0) || (dir == 1 && node & 0x40 != 0);
        let addr = 6 + 2 * n + dir as usize;
        if addr >= input.len() {
            return Err(Error::OobInput);
        }
        let next = input[addr];
        if is_leaf_next {
            out.push(next);
            node = 0;
            n = 0;
        } else {
            node = next;
            n += (node & 0x3F) as usize + 1;
        }
    }
    Ok((out, inp.consumed()))
}

#[derive(Clone, Copy)]
struct NodeV {
    node: usize,
    index: usize,
}

fn place_node(
    tree: &[TreeNode],
    nv: NodeV,
    buf: &mut Vec<u8>,
    addr: &mut usize,
    stack: &mut Vec<NodeV>,
) -> Result<()> {
    if buf.len() <= nv.index {
        buf.resize(nv.index + 1, 0);
    }
    let n = &tree[nv.node];
    if n.is_leaf {
        buf[nv.index] = n.value as u8;
        return Ok(());
    }
    let offset = ((*addr & !1) as i64 - (nv.index & !1) as i64 - 1) / 2;
    if offset < 0 || offset as usize >= 0x40 {
        return Err(Error::HuffDist);
    }
    let left_idx = *addr;
    *addr += 1;
    let right_idx = *addr;
    *addr += 1;
    if buf.len() <= right_idx {
        buf.resize(right_idx + 1, 0);
    }
    let mut byte = offset as u8;
    if tree[n.right].is_leaf {
        byte |= 0x40;
    }
    if tree[n.left].is_leaf {
        byte |= 0x80;
    }
    buf[nv.index] = byte;
    if stack.len() + 2 >= NODE_LIMIT {
        return Err(Error::HuffNodes);
    }
    stack.push(NodeV { node: n.right, index: right_idx });
    stack.push(NodeV { node: n.left, index: left_idx });
    Ok(())
}

/// Lay the tree out using the multi-stack placement scheme: nodes are
/// normally placed LIFO from the single active stack, but a node waiting
/// too long (its distance would overflow the 6-bit offset field) is pulled
/// out-of-order into a fresh stack so it still gets placed before it ages
/// out of range.
fn gba_tree(tree: &[TreeNode], root: usize) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut addr = 2usize;
    let mut stacks: Vec<Vec<NodeV>> = vec![vec![NodeV { node: root, index: 1 }]];

    while !stacks.is_empty() {
        let found = stacks
            .iter()
            .position(|s| !s.is_empty() && (addr as i64 - s[0].index as i64) >= AGE_THRESHOLD);

        let (nv, is_new_stack) = match found {
            Some(old_idx) => {
                let nv = stacks[old_idx].remove(0);
                if stacks[old_idx].is_empty() {
                    stacks.remove(old_idx);
                }
                (nv, true)
            }
            None => {
                let nv = stacks[0].pop().ok_or(Error::HuffNodes)?;
                (nv, false)
            }
        };

        if is_new_stack {
            if stacks.len() + 1 > STACK_LIMIT {
                return Err(Error::HuffStacks);
            }
            stacks.push(Vec::new());
        }
        let target = if is_new_stack { stacks.len() - 1 } else { 0 };

        place_node(tree, nv, &mut buf, &mut addr, &mut stacks[target])?;

        if stacks[target].is_empty() {
            stacks.remove(target);
        }
    }
    Ok(buf)
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut counts = [0u64; 256];
    for &b in input {
        counts[b as usize] += 1;
    }
    let mut entries: Vec<(u64, u8)> =
        counts.iter().enumerate().filter(|&(_, &c)| c > 0).map(|(v, &c)| (c, v as u8)).collect();
    if entries.is_empty() {
        return Err(Error::HuffNoLeaf);
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let leaves: Vec<TreeNode> = entries.iter().map(|&(c, v)| TreeNode::leaf(c, v as u16)).collect();

    let (mut tree, root) = build(leaves, false);
    set_parents(&mut tree, root);

    let mut value_to_leaf = [None; 256];
    for (idx, n) in tree.iter().enumerate() {
        if n.is_leaf {
            value_to_leaf[n.value as usize] = Some(idx);
        }
    }

    let buf = gba_tree(&tree, root)?;
    let node_count = buf.len() - 1; // buf[0] is unused scratch, as in the C source

    let mut header_size = 5 + node_count;
    if header_size % 4 != 0 {
        header_size += 4 - (header_size % 4);
    }

    let mut out = ByteStream::for_output(header_size + input.len() * 2 + 64);
    out.write_byte(0x28)?;
    out.write_byte(input.len() as u8)?;
    out.write_byte((input.len() >> 8) as u8)?;
    out.write_byte((input.len() >> 16) as u8)?;
    out.write_byte(((header_size - 5) / 2) as u8)?;
    for &b in &buf[1..] {
        out.write_byte(b)?;
    }
    out.pos = header_size;
    out.bit_pos = 0;
    out.byte_pos = 0;

    for &b in input {
        let leaf = value_to_leaf[b as usize].ok_or(Error::HuffLeafVal)?;
        let (seq, bits) = path_to_root(&tree, leaf);
        for k in 0..bits {
            out.write_bit_be32(((seq >> k) & 1) as u8)?;
        }
    }
    out.pad_be32();
    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for input in [&b"gba huffman gba huffman test"[..], &[3u8; 40][..], &(0..200u32).map(|x| (x % 17) as u8).collect::<Vec<u8>>()[..]] {
            let c = compress(input).unwrap();
            let d = decompress(&c).unwrap();
            assert_eq!(d, input);
        }
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut bogus = vec![0x30u8, 0, 0, 0, 0, 0];
        bogus[0] = 0x38;
        assert_eq!(decompress(&bogus), Err(Error::SigWrong));
    }
}

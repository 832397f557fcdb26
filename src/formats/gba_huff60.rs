//! GBA-Huff60 (type 0x60): adaptive Huffman coding used by the GBA releases
//! of DKC2 and DKC3. The tree starts with only a "quit" leaf and a "new
//! value" escape leaf and grows one leaf at a time as unseen bytes are
//! encountered, with weights updated (and occasionally rescaled) after every
//! symbol so encoder and decoder stay in lockstep without a transmitted
//! table.
//!
//! Grounded in full on `gbahuff60.c`. Its bit packing (`bitpos` 0..7
//! ascending, `val << bit`) is the same linear LSB-first scheme as every
//! other non-BIOS format here, so this reuses `ByteStream::read_bit_lsb` /
//! `write_bit_lsb`.

use crate::bitstream::ByteStream;
use crate::error::{Error, Result};

const NODE_LIMIT: usize = 515;
const QUIT: u16 = 0x100;
const NEW_LEAF: u16 = 0x101;

#[derive(Clone, Copy)]
enum Kind {
    Leaf(u16),
    Node { l: usize, r: usize },
}

#[derive(Clone, Copy)]
struct Node {
    kind: Kind,
    weight: i64,
    parent: i64,
}

impl Default for Node {
    fn default() -> Self {
        Node { kind: Kind::Leaf(0), weight: 0, parent: -1 }
    }
}

fn initial_tree() -> Vec<Node> {
    let mut tree = vec![Node::default(); NODE_LIMIT];
    tree[0] = Node { kind: Kind::Node { l: 1, r: 2 }, weight: 2, parent: -1 };
    tree[1] = Node { kind: Kind::Leaf(QUIT), weight: 1, parent: 0 };
    tree[2] = Node { kind: Kind::Leaf(NEW_LEAF), weight: 1, parent: 0 };
    tree
}

/// Push all leaves to the back of the live range and halve their weights,
/// then rebuild the internal nodes above them, keeping the ordering
/// invariant (nodes sorted by ascending weight from `pnode+1` onward).
fn rebuild_tree(tree: &mut [Node], node_count: usize) {
    log::trace!("huff60: rebuilding tree, node_count={}", node_count);
    let mut node = node_count;
    let mut pnode: i64 = node_count as i64 - 1;
    while node > 0 {
        node -= 1;
        if let Kind::Leaf(_) = tree[node].kind {
            tree[pnode as usize] = tree[node];
            tree[pnode as usize].weight = (tree[pnode as usize].weight + 1) / 2;
            pnode -= 1;
        }
    }

    let mut node: i64 = node_count as i64 - 2;
    while node > 0 {
        let weight = tree[node as usize].weight + tree[(node + 1) as usize].weight;

        let mut rnode = pnode + 1;
        while weight < tree[rnode as usize].weight {
            rnode += 1;
        }
        rnode -= 1;

        let count = (rnode - pnode) as usize;
        for k in 0..count {
            tree[(pnode as usize) + k] = tree[(pnode as usize) + k + 1];
        }

        tree[rnode as usize] = Node {
            kind: Kind::Node { l: node as usize, r: (node + 1) as usize },
            weight,
            parent: -1,
        };

        node -= 2;
        pnode -= 1;
    }

    let mut node = node_count;
    while node > 0 {
        node -= 1;
        if let Kind::Node { l, r } = tree[node].kind {
            tree[l].parent = node as i64;
            tree[r].parent = node as i64;
        }
    }
}

/// Split the node at `node_count - 1` into a fresh internal node carrying
/// the old occupant plus a brand new zero-weight leaf for `val`.
fn add_leaf(tree: &mut [Node], node_count: usize, val: u8) -> Result<usize> {
    if node_count + 1 >= NODE_LIMIT {
        return Err(Error::HuffNodeLim);
    }
    for slot in tree.iter().take(node_count) {
        if let Kind::Leaf(v) = slot.kind {
            if v == val as u16 {
                return Err(Error::HuffLeafVal);
            }
        }
    }

    let new_leaf = Node { kind: Kind::Leaf(val as u16), weight: 0, parent: (node_count - 1) as i64 };
    let new_node =
        Node { kind: Kind::Node { l: node_count, r: node_count + 1 }, weight: 1, parent: tree[node_count - 1].parent };

    tree[node_count + 1] = new_leaf;
    tree[node_count] = tree[node_count - 1];
    tree[node_count].parent = (node_count - 1) as i64;
    tree[node_count - 1] = new_node;

    Ok(node_count + 1)
}

/// Swap the nodes at two positions, keeping each position's own `parent`
/// field (an index is a position in the flat array, so whatever already
/// pointed at `aa`/`bb` still should after the swap) while moving content
/// and re-pointing any children to their node's new home.
fn swap_nodes(tree: &mut [Node], aa: usize, bb: usize) {
    let a = tree[aa];
    let b = tree[bb];
    if let Kind::Node { l, r } = a.kind {
        tree[l].parent = bb as i64;
        tree[r].parent = bb as i64;
    }
    if let Kind::Node { l, r } = b.kind {
        tree[l].parent = aa as i64;
        tree[r].parent = aa as i64;
    }
    tree[aa] = b;
    tree[aa].parent = a.parent;
    tree[bb] = a;
    tree[bb].parent = b.parent;
}

/// Bump `node`'s weight, then bubble it up past any lower-weight siblings
/// (restoring the ascending-weight invariant) and repeat for each ancestor.
fn update_weights(tree: &mut [Node], mut node: i64) {
    while node >= 0 {
        tree[node as usize].weight += 1;
        let mut pnode = node;
        loop {
            let old = pnode;
            pnode -= 1;
            if old == 0 {
                break;
            }
            if tree[pnode as usize].weight < tree[node as usize].weight {
                continue;
            }
            break;
        }
        pnode += 1;
        if pnode != node {
            swap_nodes(tree, pnode as usize, node as usize);
        }
        node = tree[pnode as usize].parent;
    }
}

fn find_leaf(tree: &[Node], node_count: usize, val: u16) -> Option<usize> {
    (1..node_count).find(|&i| matches!(tree[i].kind, Kind::Leaf(v) if v == val))
}

pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    Ok(decompress_sized(input)?.0)
}

/// Decode, additionally returning the number of input bytes consumed.
pub fn decompress_sized(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    if input.len() < 4 {
        return Err(Error::InputSmall);
    }
    if input[0] != 0x60 {
        return Err(Error::SigWrong);
    }
    let data_length = input[1] as usize | (input[2] as usize) << 8 | (input[3] as usize) << 16;

    let mut tree = initial_tree();
    let mut node_count = 3usize;

    let mut inp = ByteStream::from_input(input);
    inp.pos = 4;
    let mut out = Vec::with_capacity(data_length);

    loop {
        let mut node = 0usize;
        let value = loop {
            match tree[node].kind {
                Kind::Node { l, r } => {
                    node = if inp.read_bit_lsb()? != 0 { r } else { l };
                }
                Kind::Leaf(v) => break v,
            }
        };

        let out_byte;
        match value {
            QUIT => break,
            NEW_LEAF => {
                let mut v: u16 = 0;
                for _ in 0..8 {
                    v = (v << 1) | inp.read_bit_lsb()? as u16;
                }
                out_byte = v as u8;
                node = add_leaf(&mut tree, node_count, out_byte)?;
                node_count += 2;
            }
            v => {
                out_byte = v as u8;
            }
        }

        out.push(out_byte);
        if out.len() > data_length {
            return Err(Error::SizeWrong);
        }

        if tree[0].weight >= 0x8000 {
            rebuild_tree(&mut tree, node_count);
            node = find_leaf(&tree, node_count, out_byte as u16).ok_or(Error::HuffWrong)?;
        }
        update_weights(&mut tree, node as i64);
    }

    if out.len() != data_length {
        return Err(Error::SizeWrong);
    }
    Ok((out, inp.consumed()))
}

fn encode_leaf(tree: &[Node], mut node: usize, out: &mut ByteStream) -> Result<()> {
    let mut seq: u32 = 0;
    let mut bits: u8 = 0;
    while tree[node].parent >= 0 {
        let parent = tree[node].parent as usize;
        seq <<= 1;
        if let Kind::Node { r, .. } = tree[parent].kind {
            if node == r {
                seq |= 1;
            }
        }
        node = parent;
        bits += 1;
    }
    while bits > 0 {
        bits -= 1;
        let bit = (seq & 1) as u8;
        seq >>= 1;
        out.write_bit_lsb(bit)?;
    }
    Ok(())
}

pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut tree = initial_tree();
    let mut node_count = 3usize;

    let mut out = ByteStream::for_output(input.len() * 2 + 64);
    out.write_byte(0x60)?;
    out.write_byte(input.len() as u8)?;
    out.write_byte((input.len() >> 8) as u8)?;
    out.write_byte((input.len() >> 16) as u8)?;

    for &val in input {
        let mut node = find_leaf(&tree, node_count, val as u16);
        match node {
            Some(n) => encode_leaf(&tree, n, &mut out)?,
            None => {
                let esc = find_leaf(&tree, node_count, NEW_LEAF).ok_or(Error::HuffWrong)?;
                encode_leaf(&tree, esc, &mut out)?;
                for i in 0..8 {
                    out.write_bit_lsb((val >> (7 ^ i)) & 1)?;
                }
                let added = add_leaf(&mut tree, node_count, val)?;
                node_count += 2;
                node = Some(added);
            }
        }
        let mut node = node.ok_or(Error::HuffWrong)?;

        if tree[0].weight >= 0x8000 {
            rebuild_tree(&mut tree, node_count);
            node = find_leaf(&tree, node_count, val as u16).ok_or(Error::HuffWrong)?;
        }
        update_weights(&mut tree, node as i64);
    }

    let quit = find_leaf(&tree, node_count, QUIT).ok_or(Error::HuffWrong)?;
    encode_leaf(&tree, quit, &mut out)?;
    out.pad_bit_lsb();
    Ok(out.written().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_alphabet() {
        for input in [
            &b"aaaaabbbbbcccccaaaaa"[..],
            &[7u8; 50][..],
            &(0..300u32).map(|x| (x % 11) as u8).collect::<Vec<u8>>()[..],
        ] {
            let c = compress(input).unwrap();
            let d = decompress(&c).unwrap();
            assert_eq!(d, input);
        }
    }

    #[test]
    fn round_trips_full_byte_range() {
        let input: Vec<u8> = (0..=255u16).map(|x| x as u8).cycle().take(600).collect();
        let c = compress(&input).unwrap();
        let d = decompress(&c).unwrap();
        assert_eq!(d, input);
    }

    #[test]
    fn rejects_wrong_signature() {
        let bogus = vec![0x61u8, 0, 0, 0];
        assert_eq!(decompress(&bogus), Err(Error::SigWrong));
    }
}

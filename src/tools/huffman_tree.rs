//! Two-queue canonical Huffman tree construction, shared by every static
//! Huffman format (`gba_huff20`, `gba_huff50`, DKL's tileset tree).
//!
//! Every one of those C sources builds its tree the same way: a pre-sorted
//! leaf queue and a FIFO queue of freshly merged internal nodes, repeatedly
//! dequeuing the two cheapest available nodes (`generate_tree` in
//! `gbahuff20.c`, `init_tree` in `gbahuff50.c`, and `generate_tree` in
//! `dkl_tileset.c`, the last of which literally says "copy/paste from
//! GBA_HUFF20" in a comment). Only the leaf tie-break rule differs.

#[derive(Clone, Copy, Debug)]
pub struct TreeNode {
    pub count: u64,
    pub is_leaf: bool,
    pub value: u16,
    pub left: usize,
    pub right: usize,
    pub parent: i64,
}

impl TreeNode {
    pub fn leaf(count: u64, value: u16) -> Self {
        TreeNode { count, is_leaf: true, value, left: 0, right: 0, parent: -1 }
    }
}

/// Merge a pre-sorted leaf queue (ascending by count is not required; callers
/// sort however their format demands) against internal nodes created along
/// the way. Returns the full arena and the root's index.
///
/// `leaf_wins_on_tie` selects `<=` (Huff50/DKL: leaf preferred on equal
/// count) versus `<` (Huff20: internal node preferred on equal count).
pub fn build(leaves: Vec<TreeNode>, leaf_wins_on_tie: bool) -> (Vec<TreeNode>, usize) {
    let lqc = leaves.len();
    let mut tree: Vec<TreeNode> = Vec::with_capacity(2 * lqc.max(1));
    let mut node_q: Vec<TreeNode> = Vec::new();
    let mut lqp = 0usize;
    let mut nqp = 0usize;
    let mut root = 0usize;

    loop {
        if lqp >= leaves.len() && nqp >= node_q.len() {
            break;
        }
        for _ in 0..2 {
            let leaf_avail = lqp < leaves.len();
            let node_avail = nqp < node_q.len();
            let take_leaf = if leaf_avail && node_avail {
                if leaf_wins_on_tie {
                    leaves[lqp].count <= node_q[nqp].count
                } else {
                    leaves[lqp].count < node_q[nqp].count
                }
            } else {
                leaf_avail
            };
            if take_leaf && leaf_avail {
                tree.push(leaves[lqp]);
                lqp += 1;
            } else if node_avail {
                tree.push(node_q[nqp]);
                nqp += 1;
            }
        }
        let ts = tree.len();
        if ts % 2 == 1 {
            root = ts - 1;
            break;
        }
        let l = ts - 2;
        let r = ts - 1;
        let weight = tree[l].count + tree[r].count;
        node_q.push(TreeNode { count: weight, is_leaf: false, value: 0, left: l, right: r, parent: -1 });
    }
    (tree, root)
}

/// Fill in `parent` links by walking down from `root`.
pub fn set_parents(tree: &mut [TreeNode], root: usize) {
    fn visit(tree: &mut [TreeNode], node: usize) {
        if tree[node].is_leaf {
            return;
        }
        let (l, r) = (tree[node].left, tree[node].right);
        tree[l].parent = node as i64;
        tree[r].parent = node as i64;
        visit(tree, l);
        visit(tree, r);
    }
    visit(tree, root);
}

/// Walk a leaf up to the root, returning the bit sequence and its length.
/// Each step appends the child-is-right bit at the bottom, so the bit
/// closest to the root ends up at position 0: callers must emit it LSB
/// first (ascending `k`, not `.rev()`) to get root-to-leaf transmission
/// order, matching a decoder that descends from the root one bit at a time.
pub fn path_to_root(tree: &[TreeNode], mut node: usize) -> (u32, u8) {
    let mut seq = 0u32;
    let mut bits = 0u8;
    while tree[node].parent >= 0 {
        let parent = tree[node].parent as usize;
        seq <<= 1;
        if node == tree[parent].right {
            seq |= 1;
        }
        node = parent;
        bits += 1;
    }
    (seq, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_leaves_merge_to_one_root() {
        let leaves = vec![TreeNode::leaf(5, b'a' as u16), TreeNode::leaf(2, b'b' as u16)];
        let (tree, root) = build(leaves, true);
        assert_eq!(tree[root].count, 7);
        assert!(!tree[root].is_leaf);
    }

    #[test]
    fn path_round_trips_through_four_leaves() {
        let mut leaves = vec![
            TreeNode::leaf(1, 0),
            TreeNode::leaf(1, 1),
            TreeNode::leaf(2, 2),
            TreeNode::leaf(4, 3),
        ];
        leaves.sort_by(|a, b| a.count.cmp(&b.count));
        let (mut tree, root) = build(leaves, true);
        set_parents(&mut tree, root);
        for i in 0..tree.len() {
            if tree[i].is_leaf {
                let (_, bits) = path_to_root(&tree, i);
                assert!(bits > 0);
            }
        }
    }
}

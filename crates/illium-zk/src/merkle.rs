//! Merkle tree over execution trace leaves
//!
//! Leaves are hashed as `SHA256(0x00 || leaf)` and internal nodes as
//! `SHA256(0x01 || left || right)`, so a leaf can never be passed off as a node.

use sha2::{Digest, Sha256};

use crate::error::{Result, ZkError};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// A Merkle tree committing to a list of 32-byte leaves
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first)
    nodes: Vec<Vec<[u8; 32]>>,
    /// Number of leaves
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a Merkle tree from a list of leaf values
    pub fn from_leaves(leaves: &[[u8; 32]]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(ZkError::ProofConstruction(
                "Cannot create tree with no leaves".into(),
            ));
        }

        let mut level: Vec<[u8; 32]> = leaves.iter().map(hash_leaf).collect();
        let mut nodes = Vec::new();

        while level.len() > 1 {
            let next: Vec<[u8; 32]> = level
                .chunks(2)
                // Odd number of nodes: pair the last one with itself
                .map(|pair| hash_node(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            nodes.push(level);
            level = next;
        }
        nodes.push(level);

        Ok(Self {
            nodes,
            leaf_count: leaves.len(),
        })
    }

    /// Get the Merkle root
    pub fn root(&self) -> [u8; 32] {
        // from_leaves always pushes a final single-node level
        self.nodes.last().map_or([0u8; 32], |top| top[0])
    }

    /// Get the number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Number of siblings in every authentication path
    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Authentication path for the leaf at `index`, bottom level first
    pub fn proof(&self, index: usize) -> Result<Vec<[u8; 32]>> {
        if index >= self.leaf_count {
            return Err(ZkError::ProofConstruction(format!(
                "Index {} out of range (tree has {} leaves)",
                index, self.leaf_count
            )));
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut current = index;

        for level in &self.nodes[..self.nodes.len() - 1] {
            let sibling = if current % 2 == 0 {
                // Left child; an unpaired last node is its own sibling
                if current + 1 < level.len() {
                    current + 1
                } else {
                    current
                }
            } else {
                current - 1
            };

            path.push(level[sibling]);
            current /= 2;
        }

        Ok(path)
    }

    /// Check that `leaf` sits at `index` under `root`
    pub fn verify_proof(root: &[u8; 32], leaf: &[u8; 32], index: usize, path: &[[u8; 32]]) -> bool {
        let mut current_hash = hash_leaf(leaf);
        let mut current = index;

        for sibling in path {
            current_hash = if current % 2 == 0 {
                hash_node(&current_hash, sibling)
            } else {
                hash_node(sibling, &current_hash)
            };
            current /= 2;
        }

        current == 0 && current_hash == *root
    }
}

/// Depth of a tree with `leaf_count` leaves
pub fn depth_for(leaf_count: usize) -> usize {
    let mut depth = 0;
    let mut width = leaf_count.max(1);
    while width > 1 {
        width = width.div_ceil(2);
        depth += 1;
    }
    depth
}

fn hash_leaf(leaf: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn hash_node(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<[u8; 32]> {
        (0..n)
            .map(|i| {
                let mut leaf = [0u8; 32];
                leaf[..8].copy_from_slice(&(i as u64).to_be_bytes());
                leaf
            })
            .collect()
    }

    #[test]
    fn test_merkle_tree_single_leaf() {
        let leaves = leaves(1);
        let tree = MerkleTree::from_leaves(&leaves).unwrap();

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.root(), hash_leaf(&leaves[0]));
        assert!(MerkleTree::verify_proof(&tree.root(), &leaves[0], 0, &[]));
    }

    #[test]
    fn test_merkle_tree_many_leaves() {
        for n in [2, 3, 7, 100] {
            let leaves = leaves(n);
            let tree = MerkleTree::from_leaves(&leaves).unwrap();
            assert_eq!(tree.depth(), depth_for(n));

            for i in [0, n / 2, n - 1] {
                let path = tree.proof(i).unwrap();
                assert!(
                    MerkleTree::verify_proof(&tree.root(), &leaves[i], i, &path),
                    "Failed to verify leaf {} of {}",
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn test_merkle_proof_invalid() {
        let leaves = leaves(4);
        let tree = MerkleTree::from_leaves(&leaves).unwrap();
        let path = tree.proof(0).unwrap();

        // Wrong leaf
        assert!(!MerkleTree::verify_proof(&tree.root(), &[9u8; 32], 0, &path));
        // Wrong index
        assert!(!MerkleTree::verify_proof(&tree.root(), &leaves[0], 1, &path));
        // Index beyond the path's reach
        assert!(!MerkleTree::verify_proof(&tree.root(), &leaves[0], 4, &path));
    }

    #[test]
    fn test_empty_and_out_of_range() {
        assert!(MerkleTree::from_leaves(&[]).is_err());
        let tree = MerkleTree::from_leaves(&leaves(3)).unwrap();
        assert!(tree.proof(3).is_err());
    }

    #[test]
    fn test_depth_for() {
        assert_eq!(depth_for(1), 0);
        assert_eq!(depth_for(2), 1);
        assert_eq!(depth_for(5), 3);
        assert_eq!(depth_for(1 << 20), 20);
    }
}

//! Partial order alignment graph: arenas, incremental construction, merging.
//!
//! A [`PoaGraph`] holds one node per base occurrence and one edge per ordered
//! node pair ever traversed by a sequence. Sequences are folded in one at a
//! time: the first as a linear chain, later ones by merging a precomputed
//! correspondence ([`Alignment`]) that may reuse nodes, branch at
//! substitutions, and rejoin after indels. Edge weights accumulate support
//! across sequences and drive consensus extraction.
//!
//! Nodes and edges are owned by the graph and referenced by dense indices;
//! adjacency lists and aligned-alternate sets are index sets, never pointers.

use std::collections::BTreeSet;

use crate::alignment::Alignment;
use crate::error::{PoaError, Result};

const PHRED33_OFFSET: u8 = 33;

/// One base occurrence in the graph.
///
/// `aligned_ids` holds the ids of alternative bases competing at the same
/// alignment column; the relation is kept symmetric and transitively closed.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) letter: u8,
    /// `false` for the column's primary representative, `true` for an
    /// alternative base introduced by a later sequence.
    pub(crate) is_variant: bool,
    /// Indices into the edge arena.
    pub(crate) in_edges: Vec<usize>,
    pub(crate) out_edges: Vec<usize>,
    pub(crate) aligned_ids: Vec<usize>,
}

/// A directed connection, unique per ordered `(begin, end)` node pair.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) begin: usize,
    pub(crate) end: usize,
    /// Indices of the sequences that traverse this edge.
    pub(crate) sequence_labels: Vec<usize>,
    /// Sum of all per-traversal weight contributions.
    pub(crate) total_weight: f32,
}

/// Partial order alignment graph for multiple sequence consensus.
///
/// Built from a first sequence and grown by
/// [`add_alignment`](PoaGraph::add_alignment); the graph is always a DAG and
/// always holds at least one sequence. Consensus and MSA extraction live in
/// the [`consensus`](crate::PoaGraph::consensus) and
/// [`multiple_sequence_alignment`](crate::PoaGraph::multiple_sequence_alignment)
/// operations.
#[derive(Debug, Clone)]
pub struct PoaGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) num_sequences: usize,
    pub(crate) alphabet: BTreeSet<u8>,
    /// First node of each folded-in sequence, in insertion order.
    pub(crate) sequence_start_ids: Vec<usize>,
    /// Cached topological order, valid while `is_sorted` holds.
    pub(crate) sorted_ids: Vec<usize>,
    pub(crate) is_sorted: bool,
    /// Node path of the last heaviest-bundle traversal.
    pub(crate) consensus_ids: Vec<usize>,
}

fn check_sequence(sequence: &[u8], weights: &[f32]) -> Result<()> {
    if sequence.is_empty() {
        return Err(PoaError::InvalidInput("sequence must not be empty".into()));
    }
    if sequence.len() != weights.len() {
        return Err(PoaError::InvalidInput(format!(
            "sequence length {} does not match weights length {}",
            sequence.len(),
            weights.len()
        )));
    }
    Ok(())
}

/// Decode Phred+33 quality bytes into per-position weights (`byte - 33`).
fn phred_weights(quality: &[u8]) -> Result<Vec<f32>> {
    quality
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            if q < PHRED33_OFFSET {
                Err(PoaError::InvalidInput(format!(
                    "quality byte 0x{:02X} at position {} is below the Phred+33 offset",
                    q, i
                )))
            } else {
                Ok(f32::from(q - PHRED33_OFFSET))
            }
        })
        .collect()
}

impl PoaGraph {
    /// Create a graph from the first sequence with a uniform per-position weight.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::InvalidInput`] if the sequence is empty.
    pub fn from_sequence(sequence: &[u8], weight: f32) -> Result<Self> {
        let weights = vec![weight; sequence.len()];
        Self::from_sequence_with_weights(sequence, &weights)
    }

    /// Create a graph from the first sequence and its Phred+33 quality string.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::InvalidInput`] if the sequence is empty, the
    /// quality length differs, or a quality byte is below the Phred+33 offset.
    pub fn from_sequence_with_quality(sequence: &[u8], quality: &[u8]) -> Result<Self> {
        let weights = phred_weights(quality)?;
        Self::from_sequence_with_weights(sequence, &weights)
    }

    /// Create a graph from the first sequence with explicit per-position weights.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::InvalidInput`] if the sequence is empty or the
    /// lengths differ.
    pub fn from_sequence_with_weights(sequence: &[u8], weights: &[f32]) -> Result<Self> {
        check_sequence(sequence, weights)?;

        let mut graph = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            num_sequences: 0,
            alphabet: BTreeSet::new(),
            sequence_start_ids: Vec::new(),
            sorted_ids: Vec::new(),
            is_sorted: false,
            consensus_ids: Vec::new(),
        };

        graph.alphabet.extend(sequence.iter().copied());
        if let Some(start_id) = graph.add_sequence(sequence, weights, 0, sequence.len()) {
            graph.sequence_start_ids.push(start_id);
        }
        graph.num_sequences += 1;
        graph.topological_sort()?;
        Ok(graph)
    }

    /// Fold a new sequence into the graph with a uniform per-position weight.
    ///
    /// See [`add_alignment_with_weights`](PoaGraph::add_alignment_with_weights).
    pub fn add_alignment(
        &mut self,
        alignment: &Alignment,
        sequence: &[u8],
        weight: f32,
    ) -> Result<()> {
        let weights = vec![weight; sequence.len()];
        self.add_alignment_with_weights(alignment, sequence, &weights)
    }

    /// Fold a new sequence into the graph, weighting positions by Phred+33
    /// quality.
    ///
    /// See [`add_alignment_with_weights`](PoaGraph::add_alignment_with_weights).
    pub fn add_alignment_with_quality(
        &mut self,
        alignment: &Alignment,
        sequence: &[u8],
        quality: &[u8],
    ) -> Result<()> {
        let weights = phred_weights(quality)?;
        self.add_alignment_with_weights(alignment, sequence, &weights)
    }

    /// Fold a new sequence into the graph given its correspondence to
    /// existing nodes.
    ///
    /// An empty correspondence inserts the sequence as a disjoint chain.
    /// Otherwise the unaligned prefix and suffix become chains, and each
    /// aligned column either reuses the matching graph node, reuses an
    /// aligned alternate with the same letter, or creates a new variant node
    /// linked into the column's aligned set. Consecutive nodes on the
    /// sequence's path are connected with edges weighted by the sum of the
    /// two endpoint positions' weights.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::InvalidInput`] before any mutation if the sequence
    /// is empty, the weights length differs, or the correspondence references
    /// a node or sequence position out of range. Returns
    /// [`PoaError::GraphCorruption`] if merging the correspondence creates a
    /// cycle; the graph should then be discarded.
    pub fn add_alignment_with_weights(
        &mut self,
        alignment: &Alignment,
        sequence: &[u8],
        weights: &[f32],
    ) -> Result<()> {
        check_sequence(sequence, weights)?;
        self.check_alignment(alignment, sequence)?;

        self.alphabet.extend(sequence.iter().copied());

        let node_ids = alignment.node_ids();
        let seq_ids = alignment.seq_ids();

        let valid_seq_ids: Vec<usize> = seq_ids.iter().copied().flatten().collect();

        if valid_seq_ids.is_empty() {
            // No overlap with the graph: insert as a disjoint chain.
            if let Some(start_id) = self.add_sequence(sequence, weights, 0, sequence.len()) {
                self.sequence_start_ids.push(start_id);
            }
            self.num_sequences += 1;
            self.is_sorted = false;
            return self.topological_sort();
        }

        let first_aligned = valid_seq_ids[0];
        let last_aligned = valid_seq_ids[valid_seq_ids.len() - 1];

        let nodes_before = self.nodes.len();
        let mut start_id = self.add_sequence(sequence, weights, 0, first_aligned);
        let mut head_id = if self.nodes.len() == nodes_before {
            None
        } else {
            Some(self.nodes.len() - 1)
        };
        let tail_id = self.add_sequence(sequence, weights, last_aligned + 1, sequence.len());

        let mut prev_weight = if head_id.is_some() {
            weights[first_aligned - 1]
        } else {
            0.0
        };

        for (i, &seq_pos) in seq_ids.iter().enumerate() {
            let seq_pos = match seq_pos {
                Some(pos) => pos,
                None => continue,
            };

            let letter = sequence[seq_pos];
            let new_id = match node_ids[i] {
                None => self.add_node(letter, false),
                Some(existing) => self.resolve_aligned_node(existing, letter),
            };

            if start_id.is_none() {
                start_id = Some(new_id);
            }
            if let Some(head) = head_id {
                self.add_edge(head, new_id, prev_weight + weights[seq_pos]);
            }
            head_id = Some(new_id);
            prev_weight = weights[seq_pos];
        }

        if let (Some(head), Some(tail)) = (head_id, tail_id) {
            self.add_edge(head, tail, prev_weight + weights[last_aligned + 1]);
        }

        if let Some(start_id) = start_id {
            self.sequence_start_ids.push(start_id);
        }
        self.num_sequences += 1;
        self.is_sorted = false;
        self.topological_sort()
    }

    /// Node carrying `letter` at the alignment column of `existing`: the node
    /// itself on a letter match, a matching aligned alternate, or a fresh
    /// variant linked symmetrically into the whole aligned set.
    fn resolve_aligned_node(&mut self, existing: usize, letter: u8) -> usize {
        if self.nodes[existing].letter == letter {
            return existing;
        }

        let matching = self.nodes[existing]
            .aligned_ids
            .iter()
            .copied()
            .find(|&aid| self.nodes[aid].letter == letter);
        if let Some(aid) = matching {
            return aid;
        }

        let new_id = self.add_node(letter, true);
        let aligned = self.nodes[existing].aligned_ids.clone();
        for aid in aligned {
            self.nodes[new_id].aligned_ids.push(aid);
            self.nodes[aid].aligned_ids.push(new_id);
        }
        self.nodes[new_id].aligned_ids.push(existing);
        self.nodes[existing].aligned_ids.push(new_id);
        new_id
    }

    fn check_alignment(&self, alignment: &Alignment, sequence: &[u8]) -> Result<()> {
        let columns = alignment.node_ids().iter().zip(alignment.seq_ids());
        for (i, (&node_id, &seq_pos)) in columns.enumerate() {
            if let Some(node_id) = node_id {
                if node_id >= self.nodes.len() {
                    return Err(PoaError::InvalidInput(format!(
                        "correspondence column {} references node {}, but the graph has {} nodes",
                        i,
                        node_id,
                        self.nodes.len()
                    )));
                }
            }
            if let Some(seq_pos) = seq_pos {
                if seq_pos >= sequence.len() {
                    return Err(PoaError::InvalidInput(format!(
                        "correspondence column {} references sequence position {}, \
                         but the sequence has length {}",
                        i,
                        seq_pos,
                        sequence.len()
                    )));
                }
            }
        }
        Ok(())
    }

    fn add_node(&mut self, letter: u8, is_variant: bool) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            letter,
            is_variant,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            aligned_ids: Vec::new(),
        });
        id
    }

    /// Add a directed edge, merging into the existing `(begin, end)` edge if
    /// one exists. The current sequence index labels the traversal.
    fn add_edge(&mut self, begin: usize, end: usize, weight: f32) {
        let label = self.num_sequences;

        let existing = self.nodes[begin]
            .out_edges
            .iter()
            .copied()
            .find(|&e| self.edges[e].end == end);
        if let Some(e) = existing {
            self.edges[e].sequence_labels.push(label);
            self.edges[e].total_weight += weight;
            return;
        }

        let e = self.edges.len();
        self.edges.push(Edge {
            begin,
            end,
            sequence_labels: vec![label],
            total_weight: weight,
        });
        self.nodes[begin].out_edges.push(e);
        self.nodes[end].in_edges.push(e);
    }

    /// Append the half-open range `[begin, end)` of `sequence` as a chain of
    /// fresh nodes. Consecutive edges weigh `weights[i - 1] + weights[i]`, so
    /// a single downstream path score reflects the support of both endpoint
    /// positions. Returns the first node id, or `None` for an empty range.
    fn add_sequence(
        &mut self,
        sequence: &[u8],
        weights: &[f32],
        begin: usize,
        end: usize,
    ) -> Option<usize> {
        if begin == end {
            return None;
        }

        let first_id = self.add_node(sequence[begin], false);
        for i in begin + 1..end {
            let id = self.add_node(sequence[i], false);
            self.add_edge(id - 1, id, weights[i - 1] + weights[i]);
        }
        Some(first_id)
    }

    /// Number of nodes in the graph.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges in the graph.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of sequences folded into the graph so far.
    pub fn num_sequences(&self) -> usize {
        self.num_sequences
    }

    /// Distinct letters seen across all inserted sequences.
    pub fn alphabet(&self) -> &BTreeSet<u8> {
        &self.alphabet
    }

    /// Graphviz rendering of the graph for inspection.
    ///
    /// Nodes are labeled `id|letter`, edges with their total weight, and
    /// aligned-alternate pairs are joined by dotted lines. Diagnostic only;
    /// not a stable format.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph poa {\n");
        dot.push_str("    graph [rankdir=LR]\n");
        for (id, node) in self.nodes.iter().enumerate() {
            dot.push_str(&format!(
                "    {} [label=\"{}|{}\"]\n",
                id, id, node.letter as char
            ));
            for &e in &node.out_edges {
                let edge = &self.edges[e];
                dot.push_str(&format!(
                    "    {} -> {} [label=\"{:.3}\"]\n",
                    id, edge.end, edge.total_weight
                ));
            }
            for &aid in &node.aligned_ids {
                if aid > id {
                    dot.push_str(&format!(
                        "    {} -> {} [style=dotted, arrowhead=none]\n",
                        id, aid
                    ));
                }
            }
        }
        dot.push_str("}\n");
        dot
    }
}

//! Multiple sequence alignment extraction.
//!
//! Columns come from the rigorous topological order: each primary node opens
//! a column shared by all of its aligned alternates, so every base competing
//! at one position lands in the same column. Each stored sequence is then
//! replayed from its start node by following the out-edge labeled with the
//! sequence's index, and its letters are placed into the columns of the
//! nodes it visits; everything else is a gap.

use crate::error::Result;
use crate::graph::PoaGraph;

const GAP: u8 = b'-';

/// A gap-aligned view of every sequence folded into the graph.
///
/// Rows are in insertion order; when a consensus row was requested it is the
/// last row. All rows have length [`n_columns`](Msa::n_columns).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Msa {
    /// Aligned rows (with `-` gap characters), all the same length.
    pub rows: Vec<Vec<u8>>,
    /// Number of columns in the alignment.
    pub n_columns: usize,
}

impl Msa {
    /// Number of rows (including the consensus row if one was requested).
    pub fn n_sequences(&self) -> usize {
        self.rows.len()
    }

    /// One column of the alignment (one byte per row).
    pub fn column(&self, col: usize) -> Option<Vec<u8>> {
        if col >= self.n_columns {
            return None;
        }
        Some(self.rows.iter().map(|row| row[col]).collect())
    }
}

impl PoaGraph {
    /// Render every stored sequence as a gapped row of the alignment matrix,
    /// optionally followed by the consensus rendered the same way.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::GraphCorruption`](crate::PoaError::GraphCorruption)
    /// if the rigorous ordering detects that the graph is no longer a DAG.
    pub fn multiple_sequence_alignment(&mut self, include_consensus: bool) -> Result<Msa> {
        let rigorous = self.rigorous_sort()?;

        let mut column_of = vec![0usize; self.nodes.len()];
        let mut n_columns = 0;
        for &id in &rigorous {
            if self.nodes[id].is_variant {
                continue;
            }
            column_of[id] = n_columns;
            for &aid in &self.nodes[id].aligned_ids {
                column_of[aid] = n_columns;
            }
            n_columns += 1;
        }

        let mut rows = Vec::with_capacity(self.num_sequences + 1);
        for label in 0..self.num_sequences {
            let mut row = vec![GAP; n_columns];
            let mut id = self.sequence_start_ids[label];
            loop {
                row[column_of[id]] = self.nodes[id].letter;
                match self.next_on_path(id, label) {
                    Some(next) => id = next,
                    None => break,
                }
            }
            rows.push(row);
        }

        if include_consensus {
            self.traverse_heaviest_bundle();
            let mut row = vec![GAP; n_columns];
            for &id in &self.consensus_ids {
                row[column_of[id]] = self.nodes[id].letter;
            }
            rows.push(row);
        }

        Ok(Msa { rows, n_columns })
    }

    /// Node the given sequence moves to after `id`, if its path continues.
    fn next_on_path(&self, id: usize, label: usize) -> Option<usize> {
        self.nodes[id]
            .out_edges
            .iter()
            .copied()
            .find(|&e| self.edges[e].sequence_labels.contains(&label))
            .map(|e| self.edges[e].end)
    }
}

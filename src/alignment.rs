//! Correspondence arrays linking a new sequence to existing graph nodes.
//!
//! An [`Alignment`] is the column-by-column output of a pairwise or profile
//! alignment engine: for each column of the overlap region it names the
//! existing graph node (or `None` for an insertion relative to the graph)
//! and the position in the new sequence (or `None` for a deletion relative
//! to the sequence). [`PoaGraph::add_alignment`](crate::PoaGraph::add_alignment)
//! consumes it to fold the sequence into the graph.
//!
//! How the correspondence is computed is out of scope here; any engine that
//! produces acyclic correspondences can drive the graph.

use crate::error::{PoaError, Result};

/// Column-by-column correspondence between a new sequence and the graph.
///
/// The two arrays always have equal length. An empty alignment means "no
/// overlap found": the sequence is inserted as a disjoint chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    node_ids: Vec<Option<usize>>,
    seq_ids: Vec<Option<usize>>,
}

impl Alignment {
    /// An empty correspondence (no overlap between sequence and graph).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create from parallel column arrays.
    ///
    /// # Errors
    ///
    /// Returns [`PoaError::InvalidInput`] if the arrays differ in length.
    pub fn new(node_ids: Vec<Option<usize>>, seq_ids: Vec<Option<usize>>) -> Result<Self> {
        if node_ids.len() != seq_ids.len() {
            return Err(PoaError::InvalidInput(format!(
                "correspondence arrays differ in length: {} node ids vs {} sequence positions",
                node_ids.len(),
                seq_ids.len()
            )));
        }
        Ok(Self { node_ids, seq_ids })
    }

    /// Create from `(graph_node, seq_pos)` column pairs.
    pub fn from_pairs(pairs: &[(Option<usize>, Option<usize>)]) -> Self {
        Self {
            node_ids: pairs.iter().map(|&(n, _)| n).collect(),
            seq_ids: pairs.iter().map(|&(_, s)| s).collect(),
        }
    }

    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// `true` if there are no alignment columns (no overlap).
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub(crate) fn node_ids(&self) -> &[Option<usize>] {
        &self.node_ids
    }

    pub(crate) fn seq_ids(&self) -> &[Option<usize>] {
        &self.seq_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_alignment() {
        let a = Alignment::empty();
        assert!(a.is_empty());
        assert_eq!(a.len(), 0);
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let result = Alignment::new(vec![Some(0), Some(1)], vec![Some(0)]);
        assert!(matches!(result, Err(PoaError::InvalidInput(_))));
    }

    #[test]
    fn from_pairs_round_trip() {
        let pairs = [(Some(0), Some(0)), (None, Some(1)), (Some(2), None)];
        let a = Alignment::from_pairs(&pairs);
        assert_eq!(a.len(), 3);
        assert_eq!(a.node_ids(), &[Some(0), None, Some(2)]);
        assert_eq!(a.seq_ids(), &[Some(0), Some(1), None]);
    }
}

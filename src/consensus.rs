//! Heaviest-bundle consensus traversal.
//!
//! Longest-weighted-path dynamic program over the topologically sorted
//! graph: each node takes the incoming edge with the highest total weight
//! (ties go to the candidate predecessor whose accumulated score is at least
//! the chosen one's), accumulates the predecessor's score, and the global
//! best node seeds the traceback.
//!
//! When the best-scoring node still has outgoing edges, a branch point
//! downstream makes the naive maximum ambiguous. Branch completion repairs
//! this: sibling predecessors at the bifurcation are invalidated and the
//! scores of everything after it are recomputed from the surviving branch
//! only, repeating until the best node is a true sink.

use crate::graph::PoaGraph;

impl PoaGraph {
    /// Letters of the heaviest-bundle path through the graph.
    ///
    /// The path is non-empty and connected; with equal support on competing
    /// branches the tie-break is deterministic (see module docs).
    pub fn consensus(&mut self) -> Vec<u8> {
        self.traverse_heaviest_bundle();
        self.consensus_ids
            .iter()
            .map(|&id| self.nodes[id].letter)
            .collect()
    }

    /// Node ids of the heaviest-bundle path, in sequence order.
    ///
    /// For callers — such as alignment engines — that need graph positions
    /// rather than letters.
    pub fn consensus_path(&mut self) -> Vec<usize> {
        self.traverse_heaviest_bundle();
        self.consensus_ids.clone()
    }

    /// Recompute the cached consensus node path.
    pub(crate) fn traverse_heaviest_bundle(&mut self) {
        debug_assert!(self.is_sorted);

        let mut scores = vec![0.0f32; self.nodes.len()];
        let mut predecessors: Vec<Option<usize>> = vec![None; self.nodes.len()];

        let mut max_id = 0;
        for &id in &self.sorted_ids {
            for &e in &self.nodes[id].in_edges {
                let edge = &self.edges[e];
                let takes = scores[id] < edge.total_weight
                    || (scores[id] == edge.total_weight
                        && predecessors[id].map_or(false, |p| scores[p] <= scores[edge.begin]));
                if takes {
                    scores[id] = edge.total_weight;
                    predecessors[id] = Some(edge.begin);
                }
            }
            if let Some(p) = predecessors[id] {
                scores[id] += scores[p];
            }
            if scores[max_id] < scores[id] {
                max_id = id;
            }
        }

        if !self.nodes[max_id].out_edges.is_empty() {
            let mut rank_of = vec![0usize; self.nodes.len()];
            for (rank, &id) in self.sorted_ids.iter().enumerate() {
                rank_of[id] = rank;
            }

            while !self.nodes[max_id].out_edges.is_empty() {
                match self.branch_completion(&mut scores, &mut predecessors, rank_of[max_id]) {
                    Some(next) => max_id = next,
                    None => break,
                }
            }
        }

        self.consensus_ids.clear();
        let mut id = max_id;
        self.consensus_ids.push(id);
        while let Some(p) = predecessors[id] {
            self.consensus_ids.push(p);
            id = p;
        }
        self.consensus_ids.reverse();
    }

    /// Discard the branches competing with `rank`'s node at its bifurcation
    /// and recompute scores for everything after it, using only predecessors
    /// whose score is still valid (`-1.0` marks an unusable node). Returns
    /// the best node in the recomputed suffix, or `None` if no suffix node
    /// scored above zero.
    fn branch_completion(
        &self,
        scores: &mut [f32],
        predecessors: &mut [Option<usize>],
        rank: usize,
    ) -> Option<usize> {
        let node_id = self.sorted_ids[rank];
        for &e in &self.nodes[node_id].out_edges {
            for &o in &self.nodes[self.edges[e].end].in_edges {
                let begin = self.edges[o].begin;
                if begin != node_id {
                    scores[begin] = -1.0;
                }
            }
        }

        let mut max_score = 0.0f32;
        let mut max_id = None;
        for &id in &self.sorted_ids[rank + 1..] {
            scores[id] = -1.0;
            predecessors[id] = None;

            for &e in &self.nodes[id].in_edges {
                let edge = &self.edges[e];
                if scores[edge.begin] == -1.0 {
                    continue;
                }
                let takes = scores[id] < edge.total_weight
                    || (scores[id] == edge.total_weight
                        && predecessors[id].map_or(false, |p| scores[p] <= scores[edge.begin]));
                if takes {
                    scores[id] = edge.total_weight;
                    predecessors[id] = Some(edge.begin);
                }
            }
            if let Some(p) = predecessors[id] {
                scores[id] += scores[p];
            }
            if max_score < scores[id] {
                max_score = scores[id];
                max_id = Some(id);
            }
        }

        max_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Alignment;

    fn match_columns(len: usize) -> Alignment {
        let pairs: Vec<_> = (0..len).map(|i| (Some(i), Some(i))).collect();
        Alignment::from_pairs(&pairs)
    }

    #[test]
    fn single_sequence_is_its_own_consensus() {
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        assert_eq!(graph.consensus(), b"ACGT");
    }

    #[test]
    fn consensus_path_is_connected() {
        let mut graph = PoaGraph::from_sequence(b"ACGTACGT", 1.0).unwrap();
        graph
            .add_alignment(&match_columns(8), b"ACCTACGT", 1.0)
            .unwrap();
        graph.consensus();

        for pair in graph.consensus_ids.windows(2) {
            let connected = graph.nodes[pair[0]]
                .out_edges
                .iter()
                .any(|&e| graph.edges[e].end == pair[1]);
            assert!(connected, "consensus breaks between {} and {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn equal_weight_substitution_takes_latest_tied_branch() {
        // Both branches carry weight 2 through the substitution column and
        // tied upstream scores; the tie-break replaces the incumbent with an
        // equal-scoring candidate, so the branch examined last wins.
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACCT", 1.0).unwrap();
        assert_eq!(graph.consensus(), b"ACCT");
    }

    #[test]
    fn majority_branch_wins() {
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACCT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACGT", 1.0).unwrap();
        assert_eq!(graph.consensus(), b"ACGT");
    }

    #[test]
    fn higher_weight_overrules_count() {
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACGT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACCT", 5.0).unwrap();
        assert_eq!(graph.consensus(), b"ACCT");
    }

    #[test]
    fn quality_weights_drive_consensus() {
        // Phred 'I' (40) on the C variant vs two weight-1 G reads.
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        graph.add_alignment(&match_columns(4), b"ACGT", 1.0).unwrap();
        graph
            .add_alignment_with_quality(&match_columns(4), b"ACCT", b"IIII")
            .unwrap();
        assert_eq!(graph.consensus(), b"ACCT");
    }

    #[test]
    fn deletion_branch_loses_to_longer_supported_path() {
        // Second read skips the G: edge C -> T bypasses it. The full path
        // keeps more accumulated weight.
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        let deletion = Alignment::from_pairs(&[
            (Some(0), Some(0)),
            (Some(1), Some(1)),
            (Some(2), None),
            (Some(3), Some(2)),
        ]);
        graph.add_alignment(&deletion, b"ACT", 1.0).unwrap();
        assert_eq!(graph.consensus(), b"ACGT");
    }

    #[test]
    fn insertion_branch_joins_consensus_with_majority() {
        let mut graph = PoaGraph::from_sequence(b"ACT", 1.0).unwrap();
        let insertion = Alignment::from_pairs(&[
            (Some(0), Some(0)),
            (Some(1), Some(1)),
            (None, Some(2)),
            (Some(2), Some(3)),
        ]);
        graph.add_alignment(&insertion, b"ACGT", 1.0).unwrap();
        graph.add_alignment(&insertion, b"ACGT", 1.0).unwrap();
        assert_eq!(graph.consensus(), b"ACGT");
    }

    #[test]
    fn branch_completion_reaches_a_true_sink() {
        // Two heavy short reads attach their own C head before the final T,
        // so the T takes a heavy bypass edge with a near-zero upstream score.
        // The chain's second-to-last node is then the global maximum while
        // still having an out-edge; branch completion must discard the
        // bypass branches and finish the chain.
        let mut graph = PoaGraph::from_sequence(b"AAAAAAAAT", 1.0).unwrap();
        let tail_only = Alignment::from_pairs(&[(Some(8), Some(1))]);
        graph.add_alignment(&tail_only, b"CT", 5.0).unwrap();
        graph.add_alignment(&tail_only, b"CT", 5.0).unwrap();

        let consensus = graph.consensus();
        let last = *graph.consensus_ids.last().unwrap();
        assert!(graph.nodes[last].out_edges.is_empty());
        assert_eq!(consensus, b"AAAAAAAAT");
    }

    #[test]
    fn disjoint_chains_yield_heavier_chain() {
        let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
        graph
            .add_alignment(&Alignment::empty(), b"TTAAGG", 1.0)
            .unwrap();
        // The longer chain accumulates more total weight.
        assert_eq!(graph.consensus(), b"TTAAGG");
    }
}

//! Partial order alignment (POA) graph for multiple sequence consensus.
//!
//! Implements the graph layer of the POA algorithm described in:
//! C. Lee, C. Grasso, M. F. Sharlow, "Multiple sequence alignment using
//! partial order graphs", *Bioinformatics*, 18(3):452--464, 2002.
//!
//! Many noisy sequences covering the same region are folded into a DAG one
//! at a time: shared stretches collapse onto shared node chains, while
//! substitutions and indels branch out and rejoin. Edge weights accumulate
//! per-base support across sequences (uniformly, from Phred+33 qualities,
//! or explicit), so the heaviest path through the graph is the consensus,
//! and replaying each sequence against the graph's columns yields a full
//! multiple sequence alignment.
//!
//! The pairwise engine that aligns a new sequence against the graph is not
//! part of this crate: callers supply its output as an [`Alignment`]
//! (column-by-column correspondence arrays) and the graph merges it.
//!
//! # Quick start
//!
//! ```
//! use poa_consensus::{Alignment, PoaGraph};
//!
//! let mut graph = PoaGraph::from_sequence(b"ACGT", 1.0).unwrap();
//!
//! // Correspondence from the external aligner: all four columns match,
//! // position 2 substitutes C for G.
//! let alignment = Alignment::from_pairs(&[
//!     (Some(0), Some(0)),
//!     (Some(1), Some(1)),
//!     (Some(2), Some(2)),
//!     (Some(3), Some(3)),
//! ]);
//! graph.add_alignment(&alignment, b"ACCT", 1.0).unwrap();
//!
//! let msa = graph.multiple_sequence_alignment(false).unwrap();
//! assert_eq!(msa.rows, vec![b"ACGT".to_vec(), b"ACCT".to_vec()]);
//! ```

pub mod alignment;
pub mod error;
pub mod graph;
pub mod msa;

mod consensus;
mod topology;

pub use alignment::Alignment;
pub use error::{PoaError, Result};
pub use graph::PoaGraph;
pub use msa::Msa;


#[cfg(test)]
mod tests {
    use crate::test_support::align_to_consensus;
    use crate::PoaGraph;

    #[test]
    fn identical_reads_keep_the_backbone() {
        let backbone = b"ACGTTGCAAGCTAGCCTGGA";
        let mut graph = PoaGraph::from_sequence(backbone, 1.0).unwrap();
        for _ in 0..4 {
            let alignment = align_to_consensus(&mut graph, backbone);
            graph.add_alignment(&alignment, backbone, 1.0).unwrap();
        }

        assert_eq!(graph.num_sequences(), 5);
        assert_eq!(graph.num_nodes(), backbone.len());
        assert_eq!(graph.consensus(), backbone);
    }

    #[test]
    fn scattered_errors_are_outvoted() {
        let backbone = b"ACGTTGCAAGCTAGCCTGGA".to_vec();
        let mut reads = vec![backbone.clone(); 4];
        // One read-specific error each, at different positions.
        reads[1][3] = b'C';
        reads[2][10] = b'A';
        reads[3][15] = b'G';

        let mut graph = PoaGraph::from_sequence(&reads[0], 1.0).unwrap();
        for read in &reads[1..] {
            let alignment = align_to_consensus(&mut graph, read);
            graph.add_alignment(&alignment, read, 1.0).unwrap();
        }

        assert_eq!(graph.consensus(), backbone);

        let msa = graph.multiple_sequence_alignment(false).unwrap();
        for (row, read) in msa.rows.iter().zip(&reads) {
            let stripped: Vec<u8> = row.iter().copied().filter(|&c| c != b'-').collect();
            assert_eq!(&stripped, read);
        }
    }

    #[test]
    fn high_quality_read_outvotes_low_quality_ones() {
        let mut graph = PoaGraph::from_sequence(b"AACCGGTT", 1.0).unwrap();
        let alignment = align_to_consensus(&mut graph, b"AACCGGTT");
        graph.add_alignment(&alignment, b"AACCGGTT", 1.0).unwrap();

        let variant = b"AACCAGTT";
        let alignment = align_to_consensus(&mut graph, variant);
        graph
            .add_alignment_with_quality(&alignment, variant, b"IIIIIIII")
            .unwrap();

        assert_eq!(graph.consensus(), variant);
    }

    #[test]
    fn indel_reads_round_trip_through_the_msa() {
        let reads: [&[u8]; 4] = [b"ACGTTGCAAGC", b"ACGTGCAAGC", b"ACGTTTGCAAGC", b"ACGTTGCAGGC"];
        let mut graph = PoaGraph::from_sequence(reads[0], 1.0).unwrap();
        for read in &reads[1..] {
            let alignment = align_to_consensus(&mut graph, read);
            graph.add_alignment(&alignment, read, 1.0).unwrap();
        }

        let msa = graph.multiple_sequence_alignment(true).unwrap();
        assert_eq!(msa.n_sequences(), reads.len() + 1);
        for row in &msa.rows {
            assert_eq!(row.len(), msa.n_columns);
        }
        for (row, read) in msa.rows.iter().zip(reads) {
            let stripped: Vec<u8> = row.iter().copied().filter(|&c| c != b'-').collect();
            assert_eq!(stripped, read);
        }
    }
}

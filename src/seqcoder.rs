use std::collections::HashMap;
use std::sync::Arc;

use crate::column::Allele;

/// Output of a flushed sequence-coder run: one shared `hap2seq` plus one
/// `seq2allele` row per accepted marker, in acceptance order.
pub struct SeqCodedRun {
    pub hap2seq: Arc<Vec<u32>>,
    pub seq2allele_per_marker: Vec<Vec<Allele>>,
}

/// Maintains a partition of haplotypes into sequence classes over a
/// contiguous run of markers (spec.md §4.2). Two haplotypes share a class
/// iff they have carried identical alleles at every marker accepted into
/// the current run.
pub struct SequenceCoder {
    max_n_seq: usize,
    n_haps: usize,
    hap2seq: Vec<u32>,
    n_classes: usize,
    /// Raw allele rows for markers accepted into the current run, kept so
    /// `flush` can compute each marker's `seq2allele` against the run's
    /// *final* partition (spec.md: "`hap2seq` shared by all markers in
    /// the run").
    pending: Vec<Vec<Allele>>,
}

impl SequenceCoder {
    pub fn new(n_haps: usize, max_n_seq: usize) -> Self {
        Self {
            max_n_seq,
            n_haps,
            hap2seq: vec![0; n_haps],
            n_classes: if n_haps > 0 { 1 } else { 0 },
            pending: Vec::new(),
        }
    }

    /// `maxNSeq = min(floor(2^(2*log10(n_samples)+1)), 32767)` (spec.md §4.1).
    pub fn max_n_seq_for(n_samples: usize) -> usize {
        if n_samples == 0 {
            return 1;
        }
        let exponent = 2.0 * (n_samples as f64).log10() + 1.0;
        let cap = 2f64.powf(exponent).floor();
        (cap as usize).min(32_767).max(1)
    }

    pub fn n_markers_pending(&self) -> usize {
        self.pending.len()
    }

    /// Attempts to refine the partition by splitting each class according
    /// to the allele its members carry at this marker. Returns `false`
    /// (with state unchanged) if doing so would exceed `maxNSeq`, per the
    /// accept/reject + rollback rule.
    pub fn try_accept(&mut self, alleles: &[Allele]) -> bool {
        debug_assert_eq!(alleles.len(), self.n_haps);
        let mut new_hap2seq = vec![0u32; self.n_haps];
        let mut class_of: HashMap<(u32, Allele), u32> = HashMap::new();
        let mut next_id: u32 = 0;
        for h in 0..self.n_haps {
            let key = (self.hap2seq[h], alleles[h]);
            let id = *class_of.entry(key).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            new_hap2seq[h] = id;
        }

        if next_id as usize > self.max_n_seq {
            return false;
        }

        self.hap2seq = new_hap2seq;
        self.n_classes = next_id as usize;
        self.pending.push(alleles.to_vec());
        true
    }

    /// Emits the accumulated run and resets state. Returns `None` if no
    /// marker was accepted since the last flush.
    pub fn flush(&mut self) -> Option<SeqCodedRun> {
        if self.pending.is_empty() {
            return None;
        }
        let hap2seq = Arc::new(self.hap2seq.clone());
        let n_classes = self.n_classes;

        let mut seq2allele_per_marker = Vec::with_capacity(self.pending.len());
        for raw in &self.pending {
            let mut seq2allele = vec![0 as Allele; n_classes];
            let mut filled = vec![false; n_classes];
            for h in 0..self.n_haps {
                let c = self.hap2seq[h] as usize;
                if !filled[c] {
                    seq2allele[c] = raw[h];
                    filled[c] = true;
                }
            }
            seq2allele_per_marker.push(seq2allele);
        }

        self.hap2seq = vec![0; self.n_haps];
        self.n_classes = if self.n_haps > 0 { 1 } else { 0 };
        self.pending.clear();

        Some(SeqCodedRun {
            hap2seq,
            seq2allele_per_marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fidelity_holds_for_every_marker_in_an_accepted_run() {
        let markers: Vec<Vec<Allele>> = vec![
            vec![0, 0, 1, 1, 0, 1],
            vec![0, 1, 1, 0, 0, 1],
            vec![1, 1, 1, 0, 0, 0],
        ];
        let mut coder = SequenceCoder::new(6, 32_767);
        for m in &markers {
            assert!(coder.try_accept(m));
        }
        let run = coder.flush().unwrap();
        assert_eq!(run.seq2allele_per_marker.len(), markers.len());
        for (marker_idx, original) in markers.iter().enumerate() {
            let seq2allele = &run.seq2allele_per_marker[marker_idx];
            for h in 0..6 {
                let seq = run.hap2seq[h];
                assert_eq!(seq2allele[seq as usize], original[h]);
            }
        }
    }

    #[test]
    fn rejects_and_rolls_back_when_cap_exceeded() {
        let mut coder = SequenceCoder::new(4, 2);
        assert!(coder.try_accept(&[0, 0, 1, 1])); // 2 classes, at cap
        assert!(!coder.try_accept(&[0, 1, 0, 1])); // would need 4 classes
        assert_eq!(coder.n_markers_pending(), 1, "rejected marker must not be retained");
        let run = coder.flush().unwrap();
        assert_eq!(run.seq2allele_per_marker.len(), 1);
    }

    #[test]
    fn max_n_seq_matches_formula() {
        assert_eq!(SequenceCoder::max_n_seq_for(1), 2);
        assert_eq!(SequenceCoder::max_n_seq_for(100), 32);
        assert_eq!(SequenceCoder::max_n_seq_for(10_000_000), 32_767);
    }

    #[test]
    fn flush_with_nothing_pending_is_none() {
        let mut coder = SequenceCoder::new(4, 10);
        assert!(coder.flush().is_none());
    }
}

use std::iter::Peekable;

use genome::{Base, BaseCounts, Nucleotide, QualHist, Strand, StrandBaseCounts};

use super::PileupError;

/// A parsed samtools-mpileup column: reference coordinate, reference and
/// consensus bases, and every read-base observation with its quality and
/// strand.
///
/// Nested structure: PileupColumn +-> chrom, coord (0-based)
///                                +-> ref_base / cons_base (None = 'N')
///                                L-> Vec<Nucleotide> +-> base
///                                                    +-> phred
///                                                    L-> strand
#[derive(Debug)]
pub struct PileupColumn {
    pub chrom    : String,
    pub coord    : u64,
    pub ref_base : Option<Base>,
    pub cons_base: Option<Base>,
    observations : Vec<Nucleotide>,
}

impl PileupColumn {
    /// Parse a single mpileup text line:
    /// `<chrom> <pos> <ref> <depth> <bases> <quals>` (tab-separated,
    /// 1-based position).
    ///
    /// Base-string decoding: '.'/',' resolve to the reference base on the
    /// forward/reverse strand; letters carry strand in their case; `^X`,
    /// `$` and `+N`/`-N` indel records are skipped; `*` (deletion) and
    /// `>`/`<` (reference skip) consume their quality character but yield
    /// no observation.
    ///
    /// The consensus base is the majority among non-N observations, the
    /// reference winning ties it participates in; anything else is
    /// ambiguous.
    ///
    /// # Errors
    /// See [`PileupError`]; malformed columns abort the parse.
    pub fn parse(line: &str) -> Result<Self, PileupError> {
        let mut fields = line.split('\t');
        let chrom = fields.next().filter(|chrom| !chrom.is_empty()).ok_or(PileupError::MissingField("chrom"))?;
        let pos = fields.next().ok_or(PileupError::MissingField("position"))?;
        let ref_field = fields.next().ok_or(PileupError::MissingField("reference base"))?;
        let depth = fields.next().ok_or(PileupError::MissingField("depth"))?;
        let bases = fields.next().ok_or(PileupError::MissingField("bases"))?;
        let scores = fields.next().ok_or(PileupError::MissingField("qualities"))?;

        let coord = pos
            .parse::<u64>()
            .ok()
            .and_then(|pos| pos.checked_sub(1)) // into 0-based
            .ok_or_else(|| PileupError::ParseCoord(pos.to_string()))?;
        let depth = depth
            .parse::<usize>()
            .map_err(|_| PileupError::ParseDepth(depth.to_string()))?;
        let ref_base = ref_field
            .parse::<char>()
            .ok()
            .and_then(|char| Base::try_from_ambiguous(char).ok())
            .ok_or_else(|| PileupError::ParseRefBase(ref_field.to_string()))?;

        let observations = Self::decode_bases(bases, scores, ref_base, depth)?;
        let cons_base = Self::consensus(&observations, ref_base);

        Ok(Self { chrom: chrom.to_string(), coord, ref_base, cons_base, observations })
    }

    fn decode_bases(
        bases: &str,
        scores: &str,
        ref_base: Option<Base>,
        depth: usize,
    ) -> Result<Vec<Nucleotide>, PileupError> {
        let ref_char = ref_base.map_or('N', char::from);
        let mut observations = Vec::with_capacity(depth);
        let mut scores = scores.chars();
        let mut chars = bases.chars().peekable();

        while let Some(symbol) = chars.next() {
            match symbol {
                '+' | '-' => { Self::skip_indel(&mut chars)?; continue } // skip indels
                '^'       => { chars.next(); continue }                 // skip starts (+ mapping quality)
                '$'       => continue,                                  // skip ends
                '*' | '>' | '<' => {                                    // deletions and refskips carry a score
                    scores.next().ok_or(PileupError::UnequalLength)?;
                    continue
                }
                _ => ()
            }
            let score = scores.next().ok_or(PileupError::UnequalLength)?;
            let (base, strand) = match symbol {
                '.'                         => (ref_char, Strand::Forward),
                ','                         => (ref_char, Strand::Reverse),
                c if c.is_ascii_uppercase() => (c, Strand::Forward),
                c if c.is_ascii_lowercase() => (c, Strand::Reverse),
                c                           => return Err(PileupError::InvalidBaseChar(c)),
            };
            observations.push(Nucleotide::try_new(base, score, strand)?);
        }

        match scores.next() {
            Some(_) => Err(PileupError::UnequalLength),
            None    => Ok(observations),
        }
    }

    /// Run through a Peekable iterator of base characters to consume an
    /// indel record.
    /// Indel layout: [+-][0-9]+[ACGTNacgtn]+
    ///                --  ---   -----------
    ///                |   |     + inserted/deleted sequence
    ///                |   + length of that sequence
    ///                + identifier ('+' = insertion, '-' = deletion)
    fn skip_indel<I: Iterator<Item = char>>(chars: &mut Peekable<I>) -> Result<(), PileupError> {
        let mut digits = String::new();
        while let Some(digit) = chars.next_if(char::is_ascii_digit) {
            digits.push(digit);
        }
        let length = digits.parse::<usize>().map_err(|_| PileupError::TruncatedIndel)?;
        if length == 0 {
            return Err(PileupError::TruncatedIndel);
        }
        match chars.nth(length - 1) {
            Some(_) => Ok(()),
            None    => Err(PileupError::TruncatedIndel),
        }
    }

    fn consensus(observations: &[Nucleotide], ref_base: Option<Base>) -> Option<Base> {
        let mut counts = BaseCounts::new();
        for nucleotide in observations {
            counts.record(nucleotide.base);
        }
        counts.majority(ref_base)
    }

    #[must_use]
    pub fn observations(&self) -> &[Nucleotide] {
        &self.observations
    }

    /// Per-base tallies over observations with quality >= `min_qual`.
    #[must_use]
    pub fn base_counts(&self, min_qual: u8) -> BaseCounts {
        let mut counts = BaseCounts::new();
        for nucleotide in self.filtered(min_qual) {
            counts.record(nucleotide.base);
        }
        counts
    }

    /// Strand-split per-base tallies over observations with quality >=
    /// `min_qual`.
    #[must_use]
    pub fn strand_base_counts(&self, min_qual: u8) -> StrandBaseCounts {
        let mut counts = StrandBaseCounts::default();
        for nucleotide in self.filtered(min_qual) {
            counts.record(nucleotide.base, nucleotide.strand);
        }
        counts
    }

    /// (forward, reverse) counts of a single base at quality >= `min_qual`.
    #[must_use]
    pub fn counts_for_base(&self, base: Base, min_qual: u8) -> (u32, u32) {
        self.strand_base_counts(min_qual).for_base(base)
    }

    /// Per-base, per-quality histogram of every non-N observation.
    #[must_use]
    pub fn qual_hist(&self) -> QualHist {
        let mut hist = QualHist::new();
        for nucleotide in &self.observations {
            if let Some(base) = nucleotide.base {
                hist.record(base, nucleotide.phred);
            }
        }
        hist
    }

    /// Number of non-N observations with quality >= `min_qual`.
    #[must_use]
    pub fn coverage(&self, min_qual: u8) -> u32 {
        self.base_counts(min_qual).coverage()
    }

    fn filtered(&self, min_qual: u8) -> impl Iterator<Item = &Nucleotide> {
        self.observations
            .iter()
            .filter(move |nucleotide| nucleotide.phred.score() >= min_qual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    // 'J' = Q41, 'E' = Q36, '+' = Q10, '5' = Q20, '?' = Q30, 'I' = Q40.

    #[test]
    fn parse_simple_column() -> Result<()> {
        let column = PileupColumn::parse("chr1\t1000\tA\t6\t..,,.G\tJJJJEJ")?;
        assert_eq!(column.chrom, "chr1");
        assert_eq!(column.coord, 999);
        assert_eq!(column.ref_base, Some(Base::A));
        assert_eq!(column.cons_base, Some(Base::A));
        assert_eq!(column.observations().len(), 6);

        let counts = column.base_counts(0);
        assert_eq!(counts[Base::A], 5);
        assert_eq!(counts[Base::G], 1);
        assert_eq!(counts.coverage(), 6);
        Ok(())
    }

    #[test]
    fn dots_and_commas_carry_strand() -> Result<()> {
        let column = PileupColumn::parse("ref\t42\tC\t5\t..,tT\tJJJJJ")?;
        assert_eq!(column.counts_for_base(Base::C, 0), (2, 1));
        assert_eq!(column.counts_for_base(Base::T, 0), (1, 1));
        Ok(())
    }

    #[test]
    fn filters_starts_ends_and_indels() -> Result<()> {
        // start with mapping quality, end marker, insertion and deletion records.
        let column = PileupColumn::parse("ref\t10\tA\t6\t^J..$,+2AC.,-1a,\tJJJEEE")?;
        assert_eq!(column.base_counts(0).coverage(), 6);
        assert_eq!(column.base_counts(0)[Base::A], 6);
        Ok(())
    }

    #[test]
    fn deletions_and_refskips_consume_their_score() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tG\t5\t.*.>,\tJJJJJ")?;
        assert_eq!(column.observations().len(), 3);
        assert_eq!(column.base_counts(0)[Base::G], 3);
        Ok(())
    }

    #[test]
    fn zero_coverage_column() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tT\t0\t*\t*")?;
        assert_eq!(column.observations().len(), 0);
        assert_eq!(column.cons_base, None);
        assert_eq!(column.coverage(0), 0);
        Ok(())
    }

    #[test]
    fn consensus_differs_from_reference() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tA\t10\t.GGGGGGGG.\tJJJJJJJJJJ")?;
        assert_eq!(column.cons_base, Some(Base::G));
        Ok(())
    }

    #[test]
    fn consensus_tie_favors_reference() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tA\t4\t..GG\tJJJJ")?;
        assert_eq!(column.cons_base, Some(Base::A));

        let column = PileupColumn::parse("ref\t10\tT\t4\tAAGG\tJJJJ")?;
        assert_eq!(column.cons_base, None);
        Ok(())
    }

    #[test]
    fn n_observations_do_not_vote() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tA\t5\tNNNN.\tJJJJJ")?;
        assert_eq!(column.cons_base, Some(Base::A));
        assert_eq!(column.base_counts(0).coverage(), 1);
        assert_eq!(column.base_counts(0).n_count(), 4);
        Ok(())
    }

    #[test]
    fn quality_filter_drops_observations() -> Result<()> {
        // '+' = Q10, 'J' = Q41.
        let column = PileupColumn::parse("ref\t10\tA\t4\t..GG\tJ+J+")?;
        assert_eq!(column.base_counts(0).coverage(), 4);
        let filtered = column.base_counts(20);
        assert_eq!(filtered.coverage(), 2);
        assert_eq!(filtered[Base::A], 1);
        assert_eq!(filtered[Base::G], 1);
        Ok(())
    }

    #[test]
    fn qual_hist_reflects_scores() -> Result<()> {
        let column = PileupColumn::parse("ref\t10\tA\t5\t...GN\t??I5J")?;
        let hist = column.qual_hist();
        let a_bins: Vec<(u8, u32)> = hist.iter_quals(Base::A).collect();
        assert_eq!(a_bins, vec![(30, 2), (40, 1)]);
        let g_bins: Vec<(u8, u32)> = hist.iter_quals(Base::G).collect();
        assert_eq!(g_bins, vec![(20, 1)]);
        // 'N' observations are not part of any histogram.
        assert_eq!(hist.count(Base::T), 0);
        Ok(())
    }

    #[test]
    fn unequal_lengths_error_out() {
        assert!(matches!(
            PileupColumn::parse("ref\t10\tA\t4\t....\tJJ"),
            Err(PileupError::UnequalLength)
        ));
        assert!(matches!(
            PileupColumn::parse("ref\t10\tA\t2\t..\tJJJJ"),
            Err(PileupError::UnequalLength)
        ));
    }

    #[test]
    fn malformed_fields_error_out() {
        assert!(matches!(PileupColumn::parse("ref\t0\tA\t1\t.\tJ"), Err(PileupError::ParseCoord(_))));
        assert!(matches!(PileupColumn::parse("ref\tten\tA\t1\t.\tJ"), Err(PileupError::ParseCoord(_))));
        assert!(matches!(PileupColumn::parse("ref\t10\tZZ\t1\t.\tJ"), Err(PileupError::ParseRefBase(_))));
        assert!(matches!(PileupColumn::parse("ref\t10\tA\t1\t.\t"), Err(PileupError::UnequalLength)));
        assert!(matches!(PileupColumn::parse("ref\t10\tA"), Err(PileupError::MissingField(_))));
        assert!(matches!(PileupColumn::parse("ref\t10\tA\t1\t.x\tJJ"), Err(PileupError::InvalidBaseChar('x'))));
    }

    #[test]
    fn truncated_indel_errors_out() {
        assert!(matches!(
            PileupColumn::parse("ref\t10\tA\t2\t..+5AC\tJJ"),
            Err(PileupError::TruncatedIndel)
        ));
    }
}

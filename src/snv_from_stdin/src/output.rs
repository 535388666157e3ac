//! Rendering of annotated calls into the two supported output flavours:
//! the chromosome-unaware tabular 'snp' format, and minimal VCF 4.2
//! records.

use anyhow::Result;
use itertools::Itertools;

use lowvar_io::write::GenericWriter;
use parser::OutFormat;

use crate::caller::{AnnotatedCall, CallKind};

/// Write the output header. The 'snp' format is headerless.
///
/// # Errors
/// If the underlying writer fails.
pub fn write_header(writer: &mut GenericWriter, outfmt: OutFormat) -> Result<()> {
    match outfmt {
        OutFormat::Snp => Ok(()),
        OutFormat::Vcf => writer.write_iter(vcf_header_lines()),
    }
}

fn vcf_header_lines() -> Vec<String> {
    vec![
        "##fileformat=VCFv4.2".to_string(),
        format!("##source=lowvar-rs-{}", env!("CARGO_PKG_VERSION")),
        "##INFO=<ID=AF,Number=1,Type=Float,Description=\"Variant allele frequency\">".to_string(),
        "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Coverage at the calling filter\">".to_string(),
        "##INFO=<ID=DP4,Number=4,Type=Integer,Description=\"Strand-split supporting reads: ref-fwd,ref-rev,alt-fwd,alt-rev\">".to_string(),
        "##INFO=<ID=SB,Number=1,Type=Integer,Description=\"Phred-scaled strand-bias p-value\">".to_string(),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO".to_string(),
    ]
}

/// Render one call as a single output line of the requested format.
#[must_use]
pub fn format_call(annotated: &AnnotatedCall, outfmt: OutFormat) -> String {
    match outfmt {
        OutFormat::Snp => snp_line(annotated),
        OutFormat::Vcf => vcf_line(annotated),
    }
}

/// Tabular 'snp' record:
/// `<pos> <ref> <alt> <freq> <type> <key=value;...>` (tab-separated,
/// 1-based position, fixed info-key order).
fn snp_line(annotated: &AnnotatedCall) -> String {
    let call = &annotated.call;
    let mut fields = vec![format!("coverage={}", call.coverage)];
    if let Some(pvalue) = call.pvalue {
        fields.push(format!("pvalue={pvalue:.6e}"));
    }
    let pvalue_phred = annotated.pvalue_phred().map_or("NA".to_string(), |phred| phred.to_string());
    fields.push(format!("pvalue-phred={pvalue_phred}"));
    let sb_phred = annotated.strand_bias.phred().map_or("NA".to_string(), |phred| phred.to_string());
    fields.push(format!("strandbias-phred={sb_phred}"));
    fields.push(format!("dp4={}", annotated.dp4));
    let info = fields.iter().join(";");

    format!(
        "{}\t{}\t{}\t{:.6}\t{}\t{}",
        call.coord + 1,
        call.ref_base,
        call.alt_base,
        call.freq,
        call.kind,
        info
    )
}

/// Minimal VCF 4.2 record. QUAL carries the Phred-scaled calling p-value
/// and is missing for consensus variants; AF is printed with as many
/// decimal places as the coverage has digits, so deeper columns report
/// finer frequencies.
fn vcf_line(annotated: &AnnotatedCall) -> String {
    let call = &annotated.call;
    let qual = match annotated.pvalue_phred() {
        Some(phred) => phred.to_string(),
        None        => ".".to_string(),
    };
    let af_decimals = call.coverage.to_string().len();
    let strand_bias = match annotated.strand_bias.phred() {
        Some(phred) => phred.to_string(),
        None        => "NA".to_string(),
    };
    let info = format!(
        "AF={:.*};DP={};DP4={};SB={}",
        af_decimals, call.freq, call.coverage, annotated.dp4, strand_bias
    );

    format!(
        "{}\t{}\t.\t{}\t{}\t{}\t.\t{}",
        annotated.chrom,
        call.coord + 1,
        call.ref_base,
        call.alt_base,
        qual,
        info
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::Base;
    use pretty_assertions::assert_eq;

    use crate::caller::{Dp4, SnvCall, StrandBias};

    fn low_freq_call() -> AnnotatedCall {
        AnnotatedCall {
            chrom: "chr1".to_string(),
            call: SnvCall {
                coord   : 999,
                ref_base: Base::A,
                alt_base: Base::G,
                freq    : 0.005,
                pvalue  : Some(1e-10),
                coverage: 1000,
                kind    : CallKind::LowFreqVar,
            },
            dp4        : Dp4 { ref_fwd: 498, ref_rev: 497, alt_fwd: 3, alt_rev: 2 },
            strand_bias: StrandBias::from_pvalue(1.0),
        }
    }

    fn consensus_call() -> AnnotatedCall {
        AnnotatedCall {
            chrom: "chr1".to_string(),
            call: SnvCall {
                coord   : 41,
                ref_base: Base::A,
                alt_base: Base::G,
                freq    : 0.9,
                pvalue  : None,
                coverage: 100,
                kind    : CallKind::ConsensusVar,
            },
            dp4        : Dp4 { ref_fwd: 5, ref_rev: 5, alt_fwd: 45, alt_rev: 45 },
            strand_bias: StrandBias::na(),
        }
    }

    #[test]
    fn snp_record_shape() {
        let line = format_call(&low_freq_call(), OutFormat::Snp);
        assert_eq!(
            line,
            "1000\tA\tG\t0.005000\tlow-freq-var\t\
             coverage=1000;pvalue=1.000000e-10;pvalue-phred=100;strandbias-phred=0;dp4=498,497,3,2"
        );
    }

    #[test]
    fn snp_record_for_consensus_var() {
        let line = format_call(&consensus_call(), OutFormat::Snp);
        assert_eq!(
            line,
            "42\tA\tG\t0.900000\tconsensus-var\t\
             coverage=100;pvalue-phred=NA;strandbias-phred=NA;dp4=5,5,45,45"
        );
    }

    #[test]
    fn vcf_record_shape() {
        let line = format_call(&low_freq_call(), OutFormat::Vcf);
        assert_eq!(
            line,
            "chr1\t1000\t.\tA\tG\t100\t.\tAF=0.0050;DP=1000;DP4=498,497,3,2;SB=0"
        );
    }

    #[test]
    fn vcf_record_for_consensus_var_has_no_qual() {
        let line = format_call(&consensus_call(), OutFormat::Vcf);
        assert_eq!(line, "chr1\t42\t.\tA\tG\t.\t.\tAF=0.900;DP=100;DP4=5,5,45,45;SB=NA");
    }

    #[test]
    fn vcf_af_precision_tracks_coverage_digits() {
        let mut annotated = low_freq_call();
        annotated.call.coverage = 99;
        annotated.call.freq = 0.123456;
        let line = format_call(&annotated, OutFormat::Vcf);
        assert!(line.contains("AF=0.12;DP=99"), "got: {line}");
    }

    #[test]
    fn vcf_header_is_wellformed() {
        let lines = vcf_header_lines();
        assert!(lines[0].starts_with("##fileformat=VCF"));
        assert!(lines.last().expect("non-empty header").starts_with("#CHROM\tPOS"));
    }
}

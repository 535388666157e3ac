use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use parser::{Cli, Commands};
use snv_from_stdin::RunStats;

/// One synthetic mpileup line. `bases` may only contain simple observation
/// characters ('.', ',', letters), so that the depth and quality-string
/// length match its character count.
pub fn column_line(chrom: &str, pos: u64, ref_base: char, bases: &str, qual: char) -> String {
    format!(
        "{chrom}\t{pos}\t{ref_base}\t{}\t{bases}\t{}",
        bases.len(),
        qual.to_string().repeat(bases.len())
    )
}

/// A column of `n_ref` forward-strand reference observations plus `n_alt`
/// alternative observations, all at the same quality.
pub fn uniform_column(chrom: &str, pos: u64, ref_base: char, n_ref: usize, alt: char, n_alt: usize, qual: char) -> String {
    let bases = format!("{}{}", ".".repeat(n_ref), alt.to_string().repeat(n_alt));
    column_line(chrom, pos, ref_base, &bases, qual)
}

/// Drives the `call` subcommand end-to-end through the real argument
/// parser, against a pileup file written into a scratch directory.
pub struct CallRunner {
    dir   : tempfile::TempDir,
    pileup: PathBuf,
    out   : PathBuf,
    args  : Vec<String>,
}

impl CallRunner {
    pub fn new(pileup_lines: &[String]) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let pileup = dir.path().join("sample.pileup");
        let contents = match pileup_lines.is_empty() {
            true  => String::new(),
            false => pileup_lines.join("\n") + "\n",
        };
        fs::write(&pileup, contents)?;
        let out = dir.path().join("variants.out");
        Ok(Self { dir, pileup, out, args: Vec::new() })
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(ToString::to_string));
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Run the pipeline and return the output lines.
    pub fn run(&self) -> Result<Vec<String>> {
        self.try_run()?;
        self.output_lines()
    }

    pub fn try_run(&self) -> Result<RunStats> {
        let mut argv: Vec<String> = [
            "lowvar-rs",
            "call",
            "--pileup",
            &self.pileup.display().to_string(),
            "--out",
            &self.out.display().to_string(),
            "--overwrite",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        argv.extend(self.args.iter().cloned());

        let cli = Cli::try_parse_from(argv)?;
        let Commands::Call { call } = cli.commands else {
            bail!("expected the call subcommand");
        };
        snv_from_stdin::run(&call)
    }

    pub fn output_lines(&self) -> Result<Vec<String>> {
        Ok(fs::read_to_string(&self.out)?.lines().map(ToString::to_string).collect())
    }
}

/// Split one tabular 'snp' record into its six fields.
pub fn snp_fields(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}

/// Fetch `key=value` out of a ';'-joined info field.
pub fn info_value<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    info.split(';')
        .find_map(|pair| pair.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
}

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};
use log::debug;

mod error;
pub use error::ExcludeError;

/// Parse a file of positions to exclude from calling and return them as a
/// set of forbidden coordinates.
///
/// Expected format, one range per line: `start end [comment ...]`, with
/// 0-based half-open coordinates. Lines starting with '#' and blank lines
/// are skipped; anything after the second field is ignored.
///
/// # Errors
/// - if the file cannot be opened or read
/// - [`ExcludeError`] if a line is malformed or a range is empty/inverted
pub fn read_exclude_positions(path: &Path) -> Result<AHashSet<u64>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open exclusion file '{}'", path.display()))?;

    let mut positions = AHashSet::new();
    for (idx, entry) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let entry = entry
            .with_context(|| format!("Failed to read line {line_no} of '{}'", path.display()))?;
        let line = entry.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let start = parse_bound(fields.next(), line_no)?;
        let end = parse_bound(fields.next(), line_no)?;
        if start >= end {
            return Err(ExcludeError::InvertedRange { line: line_no, start, end }.into());
        }
        positions.extend(start..end);
    }
    debug!("Excluding {} position(s) found in '{}'", positions.len(), path.display());
    Ok(positions)
}

fn parse_bound(field: Option<&str>, line_no: usize) -> Result<u64> {
    let token = field.ok_or(ExcludeError::MissingBound { line: line_no })?;
    let bound = token
        .parse::<u64>()
        .map_err(|_| ExcludeError::ParseBound { line: line_no, token: token.to_string() })?;
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_exclude_file(contents: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn parse_ranges_and_comments() -> anyhow::Result<()> {
        let file = write_exclude_file("# primer region\n10 13\n\n20 21 known artefact\n")?;
        let positions = read_exclude_positions(file.path())?;
        let mut sorted: Vec<u64> = positions.into_iter().collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![10, 11, 12, 20]);
        Ok(())
    }

    #[test]
    fn inverted_range_errors_out() -> anyhow::Result<()> {
        let file = write_exclude_file("13 10\n")?;
        let got = read_exclude_positions(file.path());
        assert!(got.is_err_and(|err| matches!(
            err.downcast_ref::<ExcludeError>(),
            Some(ExcludeError::InvertedRange { line: 1, start: 13, end: 10 })
        )));
        Ok(())
    }

    #[test]
    fn empty_range_errors_out() -> anyhow::Result<()> {
        let file = write_exclude_file("10 10\n")?;
        assert!(read_exclude_positions(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn malformed_lines_error_out() -> anyhow::Result<()> {
        for contents in ["10\n", "ten 20\n", "10 twenty\n"] {
            let file = write_exclude_file(contents)?;
            assert!(read_exclude_positions(file.path()).is_err(), "accepted {contents:?}");
        }
        Ok(())
    }

    #[test]
    fn missing_file_errors_out() {
        assert!(read_exclude_positions(Path::new("/nonexistent/excl.txt")).is_err());
    }
}

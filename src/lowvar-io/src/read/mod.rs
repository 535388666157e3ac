use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

pub mod exclude;
pub use exclude::{read_exclude_positions, ExcludeError};

/// Choose between a file handle and standard input for the pileup stream.
///
/// # Errors
/// If `path` is provided but cannot be opened for reading.
pub fn open_pileup_source(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open pileup file '{}'", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    })
}

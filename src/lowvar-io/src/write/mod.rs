use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

pub mod error;
pub use error::WriterError;

/// A generic line-oriented output writer, targeting either a file or
/// stdout.
pub struct GenericWriter<'a> {
    source: BufWriter<Box<dyn Write + 'a>>,
}

impl<'a> GenericWriter<'a> {
    /// Instantiate a new writer, linked to a file when `path` is given and
    /// to stdout otherwise.
    ///
    /// # Errors
    /// If `path` points to an invalid location, or the user lacks the
    /// permissions to write there.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>> {
        Ok(GenericWriter {
            source: match path {
                Some(path) => {
                    let file = File::create(&path)
                        .map_err(WriterError::Io)
                        .with_context(|| format!("While creating file '{}'", path.as_ref().display()))?;
                    BufWriter::new(Box::new(file))
                }
                None => BufWriter::new(Box::new(std::io::stdout())),
            },
        })
    }

    /// Append one line to the output. Contents stay buffered until
    /// [`GenericWriter::flush`] (or drop).
    ///
    /// # Errors
    /// If the underlying writer fails.
    pub fn write_line(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.source, "{line}")
            .map_err(WriterError::Io)
            .context("While writing line to output")
    }

    /// Write every item of an iterator, one line each, then flush.
    ///
    /// # Errors
    /// If any item fails to be written.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<()>
    where
        T: IntoIterator<Item = I>,
        I: Display,
    {
        for item in iter {
            self.write_line(item)?;
        }
        self.flush()
    }

    /// # Errors
    /// If the underlying writer fails to flush.
    pub fn flush(&mut self) -> Result<()> {
        self.source
            .flush()
            .map_err(WriterError::Io)
            .context("While flushing buffer contents of writer")
    }
}

/// Check whether a given output file may be written: raise an error when it
/// already exists and the user did not explicitly allow overwriting.
///
/// # Errors
/// [`WriterError::OverwriteDisallowed`] in the case described above.
pub fn can_write_file(overwrite: bool, path: &Path) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(WriterError::OverwriteDisallowed { path: path.to_path_buf() })
            .context("While ensuring the output file may be written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn write_lines_to_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.snp");
        let mut writer = GenericWriter::new(Some(&path))?;
        writer.write_iter(["first", "second"])?;
        drop(writer);

        assert_eq!(fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }

    #[test]
    fn test_can_write_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.snp");

        assert!(can_write_file(false, &path).is_ok()); // no overwrite, no file
        assert!(can_write_file(true, &path).is_ok());  // overwrite, no file

        fs::File::create(&path)?;
        assert!(can_write_file(true, &path).is_ok());  // overwrite, file
        assert!(can_write_file(false, &path).is_err_and(|err| {
            matches!(err.downcast_ref::<WriterError>(), Some(WriterError::OverwriteDisallowed { .. }))
        }));
        Ok(())
    }
}

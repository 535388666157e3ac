use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write to output: inner writer returned an io error")]
    Io(#[from] std::io::Error),

    #[error("{} already exists. Use --overwrite to force.", path.display())]
    OverwriteDisallowed { path: PathBuf },
}

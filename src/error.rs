//! Crate-level error type for failures that are not themselves DWARF
//! diagnostics: a malformed ELF container, I/O failure, or a required
//! section missing entirely (spec.md §7).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("could not open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Broken ELF.")]
    BrokenElf,

    #[error("{section} is missing from the object file")]
    MissingSection { section: &'static str },

    #[error("symbol table is missing or corrupt")]
    BrokenSymtab,
}

pub type Result<T> = std::result::Result<T, LintError>;

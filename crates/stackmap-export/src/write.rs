//! Atomic file output

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ExportError, Result};

/// Every rendered document of a run. Built in full before anything is
/// written, so a failure while rendering leaves previous outputs untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    pub files: Vec<(PathBuf, String)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, contents: String) -> &mut Self {
        self.files.push((path.into(), contents));
        self
    }
}

pub fn write_outputs(outputs: &Outputs) -> Result<()> {
    for (path, contents) in &outputs.files {
        write_atomic(path, contents)?;
        info!("Wrote {} ({} bytes)", path.display(), contents.len());
    }
    Ok(())
}

/// Write through a temporary sibling file, then rename over `path`. Readers
/// see either the old file or the complete new one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let result = (|| -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(source));
    }
    Ok(())
}

//! Register document generation.
//!
//! After a merge run a register is produced in the output folder: a
//! numbered table of the filenames that were created, dated in the
//! register's own filename. The writer is a seam so the host
//! application can substitute its own document format.

use chrono::Local;
use std::path::{Path, PathBuf};

use crate::error::{Result, ZepbError};

/// Writes the register of produced files for a merge run.
pub trait RegisterWriter: Send + Sync {
    /// Create a register listing `filenames` inside `output_folder`.
    /// Returns the path of the created document.
    fn create_register(&self, output_folder: &Path, filenames: &[String]) -> Result<PathBuf>;
}

/// Default register writer: a CSV table `№;Наименование файла` of the
/// produced basenames without extension.
#[derive(Debug, Clone, Default)]
pub struct CsvRegisterWriter;

impl CsvRegisterWriter {
    /// Create a new CSV register writer.
    pub fn new() -> Self {
        Self
    }
}

impl RegisterWriter for CsvRegisterWriter {
    fn create_register(&self, output_folder: &Path, filenames: &[String]) -> Result<PathBuf> {
        let date = Local::now().format("%d.%m.%Y");
        let out_path = output_folder.join(format!("Реестр от {date}.csv"));

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(&out_path)
            .map_err(|err| ZepbError::RegisterFailed {
                reason: err.to_string(),
            })?;

        writer
            .write_record(["№", "Наименование файла"])
            .map_err(|err| ZepbError::RegisterFailed {
                reason: err.to_string(),
            })?;

        for (index, name) in filenames.iter().enumerate() {
            let stem = match name.rfind('.') {
                Some(dot) if dot > 0 => &name[..dot],
                _ => name.as_str(),
            };
            writer
                .write_record([(index + 1).to_string().as_str(), stem])
                .map_err(|err| ZepbError::RegisterFailed {
                    reason: err.to_string(),
                })?;
        }

        writer.flush().map_err(|err| ZepbError::RegisterFailed {
            reason: err.to_string(),
        })?;

        Ok(out_path)
    }
}

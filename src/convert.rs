//! PDF -> workbook conversion of an uploaded document.

use crate::extract::{ExtractError, TableExtractor};
use crate::storage::{Storage, StorageError};
use crate::workbook::{self, WorkbookError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Nenhum arquivo PDF encontrado na pasta '{0}'")]
    NoPdf(String),

    #[error("Nenhuma tabela encontrada no PDF")]
    NoTables,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub source: PathBuf,
    pub output: PathBuf,
    pub tables: usize,
}

/// Convert an uploaded PDF into `<output_dir>/<stem>.xlsx`.
///
/// `filename` picks a specific upload; without it the most recently created
/// PDF in the upload directory is used. Nothing is written when the PDF
/// yields no tables.
pub fn convert_pdf(
    storage: &Storage,
    extractor: &dyn TableExtractor,
    filename: Option<&str>,
) -> Result<Conversion, ConvertError> {
    let source = match filename {
        Some(name) => storage.find_pdf(name)?,
        None => storage.latest_pdf()?.ok_or_else(|| {
            let dir = storage.upload_dir();
            let name = dir.file_name().unwrap_or(dir.as_os_str());
            ConvertError::NoPdf(name.to_string_lossy().into_owned())
        })?,
    };

    let tables = extractor.extract_tables(&source)?;
    if tables.is_empty() {
        return Err(ConvertError::NoTables);
    }

    let output = storage.workbook_path_for(&source);
    workbook::write_workbook(&output, &tables)?;

    tracing::info!(
        source = %source.display(),
        output = %output.display(),
        tables = tables.len(),
        "converted PDF to workbook"
    );

    Ok(Conversion { source, output, tables: tables.len() })
}

//! Upload PDFs, extract their tables into `.xlsx` workbooks, and serve the
//! `notas_fiscais` invoice table over HTTP.

pub mod config;
pub mod convert;
pub mod db;
pub mod extract;
pub mod server;
pub mod storage;
pub mod workbook;

mod schema;
mod models;

pub use schema::Database;
pub use models::{NotaFiscal, Record, NOTA_COLUMNS};

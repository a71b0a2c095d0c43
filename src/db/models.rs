use serde::{Deserialize, Serialize};

/// Column names of the `notas_fiscais` table, in declaration order.
pub const NOTA_COLUMNS: [&str; 4] = ["id", "empresa", "valor", "data"];

/// One invoice row. Every field is optional because the table declares
/// no constraints beyond column presence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NotaFiscal {
    pub id: Option<i64>,
    pub empresa: Option<String>,
    pub valor: Option<f64>,
    pub data: Option<String>,
}

/// A row as returned by the read path: column name -> JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

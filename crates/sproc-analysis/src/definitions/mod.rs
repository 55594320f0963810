//! Static definition extractor: `CREATE PROCEDURE` scripts into a catalog.

mod catalog;
mod extractor;
mod types;

pub use catalog::DefinitionCatalog;
pub use extractor::DefinitionExtractor;
pub use types::{ParameterDirection, ProcedureDefinition, ProcedureParameter};

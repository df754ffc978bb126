//! DataFusion and Delta Lake integration for `dataops`.
//!
//! This crate keeps every query-engine type out of `dataops-core`. It offers
//! two façades:
//!
//! - [`SqlSession`]: one DataFusion session over registered datasets, files
//!   and table providers.
//! - [`VersionedTable`]: a Delta Lake table with create, append, time travel,
//!   history and SQL access.
//!
//! DataFusion is used through the `deltalake::datafusion` re-export so both
//! always agree on a version.
#![deny(missing_docs)]

mod identifier;
mod session;
mod versioned;

pub use identifier::{default_table_name, quote_identifier, sanitize_identifier};
pub use session::{SqlError, SqlResult, SqlSession};
pub use versioned::{
    HistoryEntry, VersionedError, VersionedResult, VersionedTable, delta_compatible_type,
};

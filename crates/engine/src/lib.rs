//! An embedded, typed, columnar table store with transactional isolation.
//!
//! The engine exposes four layers, leaves first:
//! - [`Table`]: ordered typed columns over ordered rows, with schema
//!   mutation, search indexes and nullability conversion.
//! - [`Row`]: a weak positional cursor over one row of a table.
//! - [`TableView`]: an ordered projection of row positions (sort / find-all
//!   results).
//! - [`SharedGroup`]: the transaction manager — one writer at a time, any
//!   number of concurrent snapshot readers.
//!
//! The store is synchronous and blocking; the transaction is the sole
//! isolation unit. Persistence is a whole-group snapshot written atomically
//! on commit.

mod error;
mod group;
mod index;
mod link;
mod row;
mod schema;
mod shared_group;
mod table;
mod view;

pub use error::{Error, Result};
pub use group::Group;
pub use link::LinkView;
pub use row::Row;
pub use schema::Column;
pub use shared_group::{ReadTransaction, SharedGroup, WriteTransaction};
pub use table::Table;
pub use view::{Order, TableView};

pub use tablecore_value::{ColumnType, Value};

/// Maximum column name length, in bytes.
pub const MAX_COLUMN_NAME_LENGTH: usize = 63;

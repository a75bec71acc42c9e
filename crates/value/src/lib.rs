//! Value layer for the tablecore table store.
//!
//! This crate provides the two types every other layer dispatches on:
//! - [`ColumnType`]: the declared type of a column.
//! - [`Value`]: a tagged polymorphic value, used for Mixed cells and for
//!   positional row construction.

pub mod data_type;
pub mod types;

pub use data_type::ColumnType;
pub use types::Value;

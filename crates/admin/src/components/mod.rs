//! Reusable admin UI pieces.

pub mod data_table;

pub use data_table::{Cell, DataTable, TableColumn, TableRow};

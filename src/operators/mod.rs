//! Concrete operators: the leaves and internal nodes of the volcano-style
//! plan tree, each implementing [`crate::op_iterator::OpIterator`].

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod join;
pub mod seq_scan;

pub use aggregate::Aggregate;
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use seq_scan::SeqScan;

//! Output generation.
//!
//! - [`spreadsheet`]: writes the stored PhD offers to a timestamped `.xlsx`
//!   file

pub mod spreadsheet;

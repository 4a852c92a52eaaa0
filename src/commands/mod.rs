//! Command-line parsing and role selection

pub mod parser;

pub use parser::*;

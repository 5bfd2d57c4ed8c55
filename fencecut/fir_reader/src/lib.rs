//! FIR file reader.
//!
//! The `fir_reader` library supports reading the textual form of the fencecut IR, as produced by
//! `fir::write`. It is used to load the functions the `fencecut` driver mitigates and by the
//! tests of the analysis crates.

pub use crate::error::{Location, ParseError, ParseResult};
pub use crate::parser::{parse_function, parse_functions};

mod error;
mod lexer;
mod parser;

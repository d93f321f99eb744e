//! Input discovery and enumeration

pub mod scanner;

pub use scanner::{collect_inputs, is_flac, parse_input_list};

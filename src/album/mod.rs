//! Album container reading
//!
//! Extraction pulls tags, stream properties, pictures and the raw cuesheet
//! out of a container; the cuesheet parser then turns that text into
//! sample-accurate track boundaries.

pub mod cuesheet;
pub mod extractor;

pub use cuesheet::parse_track_list;
pub use extractor::extract;

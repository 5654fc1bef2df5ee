//! HTTP protocol layer module
//!
//! Protocol helpers shared by the file-serving collaborators and the service
//! layer: MIME lookup, byte ranges, validators and canned responses.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

pub use range::parse_range_header;
pub use response::{build_405_response, build_500_response, build_options_response};

//! Block wire format
//!
//! Blocks are written as comment delimiters around their inner markup:
//! `<!-- wp:name {"attr":1} -->inner<!-- /wp:name -->`, or
//! `<!-- wp:name {"attr":1} /-->` when there is no inner content.

mod parse;
mod serialize;

pub use parse::{parse, parse_with_depth, WireError, DEFAULT_MAX_WIRE_DEPTH};
pub use serialize::{
    escape_json, normalize, serialize, serialize_block, serialize_with, wire_attributes, wire_name,
    SerializeConfig,
};

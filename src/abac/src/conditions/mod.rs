//! Conditions template resolution
//!
//! Stored permission records carry a conditions *template*: a JSON object whose
//! string values may be placeholder tokens such as `"$user.id"`. Before a record
//! becomes a compiled rule, every placeholder is replaced with the matching
//! attribute of the user the ability is being built for.
//!
//! Placeholders are a closed table. Only a string that equals a token exactly is
//! substituted; tokens embedded in a larger string are left untouched.

pub mod placeholder;
pub mod resolver;

pub use placeholder::{lookup, tokens, Extractor};
pub use resolver::{resolve, MAX_TEMPLATE_DEPTH};

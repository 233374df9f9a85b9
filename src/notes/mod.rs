//! Structured data carried inside free-text notes fields

pub mod codec;
pub mod link;

pub use codec::{decode, encode, strip, Decoded, METADATA_TAG};
pub use link::{extract_cargo_link, with_cargo_link};

//! Content extraction: one decoder per supported format, dispatched on the
//! lower-cased file extension.

mod format;
mod markup;
mod office;
mod ooxml;
pub mod parser;
mod pdf;
mod spreadsheet;
mod text;

pub use format::{DocumentFormat, Generation};
pub use markup::{extract_visible_text, strip_markdown};
pub use parser::DocumentParser;
pub use text::{decode_text, TextEncoding};

pub mod converter;

pub use converter::{ConvertError, Converter, DocumentConverter};

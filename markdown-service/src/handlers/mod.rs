pub mod convert;
pub mod health;

pub use convert::convert_document;
pub use health::root;

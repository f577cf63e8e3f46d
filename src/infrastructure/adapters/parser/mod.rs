//! Document Parsers

mod plain_text;

pub use plain_text::PlainTextParser;

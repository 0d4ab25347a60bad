pub mod codec;
pub mod compression;
pub mod glob;
pub mod reader;
pub mod writer;

pub use codec::{RecordContext, decode, encode};
pub use reader::Slow5Reader;
pub use writer::{Slow5Writer, write_header};

//! The low-level wire encoding shared by every MOQT message.

mod decode;
mod encode;
mod reader;
mod varint;
mod version;

pub use decode::*;
pub use encode::*;
pub use reader::*;
pub use varint::*;
pub use version::*;

//! The IETF MoQ Transport draft-07 wire format.
//!
//! Only the subscriber side of the control protocol is implemented, plus subgroup object streams.

mod control;
mod group;
mod location;
mod message;
mod namespace;
mod parameters;
mod setup;
mod subscribe;
mod version;

pub(crate) use control::*;
pub use group::*;
pub use location::*;
pub use message::*;
pub use namespace::*;
pub use parameters::*;
pub use setup::*;
pub use subscribe::*;
pub use version::*;

pub mod cache;
pub mod csa;
pub mod header;
pub mod tags;

pub use cache::HeaderCache;
pub use csa::ProtocolBlock;
pub use header::{extract_vendor_fields, parse};
pub use tags::*;

//! Live session bookkeeping

mod registry;

pub use registry::SessionRegistry;

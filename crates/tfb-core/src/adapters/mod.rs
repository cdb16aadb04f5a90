//! Port adapters that ship with the core: in-memory implementations for
//! unit tests. Production adapters live in tfb-runtime.

pub mod memory;

//! Hash-keyed associative memory.
//!
//! - **Hasher**: ordered token context → integer fingerprint
//! - **Store**: fingerprint → deduplicated outcome bucket
//! - **Resolver**: nearest stored fingerprint by absolute numeric distance

pub mod hasher;
pub mod resolver;
pub mod store;

//! Decoding: turning a resolved bucket into one emitted outcome.
//!
//! Holds the frequency-ranked selector and the generator's short-term memory.

pub mod selector;
pub mod stm;

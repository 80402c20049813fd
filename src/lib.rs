//! # hashedml
//!
//! **Hash-keyed associative memory** for two tasks sharing one structure:
//!
//! 1. **Classification**: a feature sequence is fingerprinted, the nearest
//!    stored fingerprint is resolved, and a label is picked from its bucket.
//! 2. **Generation**: the same lookup is repeated on a sliding context, with
//!    a short-term memory (STM) heuristic that steers away from loops.
//!
//! ## Components
//!
//! - [`memory::hasher`]: order-sensitive integer fingerprint of a context
//! - [`memory::store`]: fingerprint → deduplicated outcome bucket
//! - [`memory::resolver`]: nearest stored fingerprint by absolute distance
//! - [`decoding::selector`]: frequency-ranked outcome selection with exclusion
//! - [`decoding::stm`]: generator short-term memory
//! - [`model`]: the owning [`HashedMl`] value: fit / predict / test / generate
//! - [`text`]: tokenization and corpus loading glue used by the CLI

pub mod decoding;
pub mod memory;
pub mod model;
pub mod text;

pub use memory::hasher::{ContextHasher, Fingerprint};
pub use memory::store::{AssociativeMemory, Bucket};
pub use model::generator::{ContextInput, GenerateOptions, GenerationStats};
pub use model::hashed_ml::{HashedMl, ModelConfig};

/// Model-wide constants.
pub mod config {
    /// 64-bit FNV offset basis; the hash ceiling is derived from it.
    pub const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;

    /// 64-bit FNV prime. Every token's running value starts here.
    pub const FNV_PRIME: u64 = 1_099_511_628_211;

    /// Ceiling exponent: the cheap update kicks in once the running value
    /// reaches `FNV_OFFSET ^ FNV_CEILING_EXP`.
    pub const FNV_CEILING_EXP: u32 = 7;

    /// Small prime folded into every character update.
    pub const HASH_PRIME: u32 = 211;

    /// Context width used for classification.
    pub const DEFAULT_NBACK: usize = 4;

    /// Context width used for text generation.
    pub const GENERATE_NBACK: usize = 5;

    /// Upper bound of the random ranking depth in unconstrained selection.
    pub const MAX_CANDIDATES: usize = 4;

    /// How many top-ranked outcomes exclusion mode draws from.
    pub const EXCLUSION_POOL: usize = 20;

    /// Draws attempted before exclusion gives up.
    pub const EXCLUSION_ATTEMPTS: usize = 30;

    /// Candidates returned by multi-candidate prediction.
    pub const TOP_CANDIDATES: usize = 10;

    /// Capacity of the STM visited-bucket FIFO.
    pub const STM_VISITED: usize = 20;

    /// Buckets with fewer distinct outcomes than this are "low diversity".
    pub const LOW_DIVERSITY: usize = 3;

    /// Steps since the last escape before another escape is attempted.
    pub const ESCAPE_PATIENCE: usize = 15;

    /// Probe attempts per escape.
    pub const ESCAPE_ATTEMPTS: usize = 10;

    /// A probed bucket with fewer distinct outcomes than this ends an escape.
    pub const CALM_DIVERSITY: usize = 4;

    /// Repetition windows span `REPEAT_WINDOW_FACTOR * nback` words.
    pub const REPEAT_WINDOW_FACTOR: usize = 2;

    /// Minimum window count before the repetition check can reject output.
    pub const REPEAT_MIN_WINDOWS: usize = 3;

    /// Key sets at least this large are scanned on the rayon pool.
    pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;
}

// ========================================================================
// Error types
// ========================================================================

/// Errors raised by the memory, model and text layers.
#[derive(Debug, thiserror::Error)]
pub enum HashedMlError {
    #[error("memory is empty: fit at least one example before predicting or generating")]
    EmptyMemory,

    #[error("fingerprint {0} not found in memory")]
    KeyNotFound(Fingerprint),

    #[error("generate() only supports a flat context, got {depth}-dimensional input")]
    UnsupportedDimension { depth: usize },

    #[error("unreadable input '{}': {source}", .path.display())]
    UnreadableInput {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("tokenizer pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, HashedMlError>;

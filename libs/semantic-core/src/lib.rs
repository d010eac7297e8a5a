pub mod canonicalizer;
pub mod embedding;
pub mod encoder;
pub mod intent_encoder;
pub mod policy_encoder;
pub mod projection;

pub use canonicalizer::{Canonicalizer, PassthroughCanonicalizer};
pub use embedding::{EmbeddingCache, EmbeddingModel, EncodeError, HashEmbedder};
pub use encoder::{Slot, SemanticEncoder};
pub use intent_encoder::IntentEncoder;
pub use policy_encoder::PolicyEncoder;

/// Input dimensionality of the text-embedding model.
pub const MODEL_DIM: usize = 384;

pub mod cosine;
pub mod error;
pub mod filter;
pub mod kv;
pub mod memory;
pub mod vecstore;

pub use cosine::cosine_similarity;
pub use error::VecError;
pub use filter::Filter;
pub use kv::KvIndex;
pub use memory::MemoryIndex;
pub use vecstore::{Match, Metadata, VecIndex, VectorRecord};

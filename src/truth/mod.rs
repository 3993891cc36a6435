//! Multi-source truth engine: cross-referencing, confidence scoring, and
//! conflict detection over independently gathered fact maps.

mod engine;
pub mod merge;
mod proptest;
pub mod similarity;
mod types;

pub use engine::{TruthEngine, VerificationMode};
pub use types::{
    ConfidenceLevel, Conflict, ConflictSeverity, Source, SourceType, SourcedData, VerifiedDataset,
    VerifiedFact,
};

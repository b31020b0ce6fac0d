pub mod collection;
pub mod ingest;
pub mod named;
pub mod sequence;

pub use collection::SequenceCollection;
pub use ingest::{classify, Input, InputKind, Payload, SeqsBuilder};
pub use named::{DistanceMatrix, IntMap, NamedSeqs};
pub use sequence::{Info, Sequence};

pub mod chimp;
pub mod sequence;

pub use chimp::{Cell, ChimpBoard, ChimpProgress, ChimpVerdict};
pub use sequence::SequencePuzzle;

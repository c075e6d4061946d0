pub mod sm2;

pub use sm2::{Sm2Algorithm, SpacedRepetitionAlgo};

pub mod source;

pub use source::{PredictionSource, SourceError, SqlitePredictionSource};

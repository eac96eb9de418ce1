pub mod pipeline;
pub mod viral;

pub use pipeline::{FilterPipeline, RankingStrategy};
pub use viral::{viral_potential, INSUFFICIENT_DATA_SCORE};

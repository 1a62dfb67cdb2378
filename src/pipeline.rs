pub mod annotate;
pub mod category;
pub mod entities;
pub mod filter;
pub mod lexicon;
pub mod load;
pub mod orchestrator;
pub mod persist;
pub(crate) mod polarity_lexicon;
pub mod report;
pub mod sentiment;
pub mod topic;

pub use orchestrator::{AnnotationPipeline, PipelineBuilder, PipelineOutcome, PipelineState};

//! Service layer: the export pipeline and its collaborators

pub mod pipeline;
pub mod planner;
pub mod registry;
pub mod transformer;

pub use pipeline::{ArchiveSummary, ChunkSummary, ExportPipeline, StoredExport};
pub use planner::ChunkPlanner;
pub use registry::{CleanupReport, ExportRegistry, StorageInfo};
pub use transformer::RecordTransformer;

pub mod archive;
pub mod pipeline;
pub mod spreadsheet;
pub mod transcript;

pub use pipeline::{
    ExportArtifact, ExportFormat, ExportPipeline, ExportRequest, ExportSelection, SkipReason,
    SkipReport, SkippedItem,
};

//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one stage of the pipeline.

pub mod dashboard;
pub mod preprocess;

pub use dashboard::{
    AmountRange, AmountWindow, DashboardService, DateWindow, Layout, MapMarker, MapSelection,
    PieSlices, SelectedPoint, TableRow,
};
pub use preprocess::{GeocodeSummary, PreprocessReport, PreprocessService};

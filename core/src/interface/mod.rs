pub mod event;
pub mod measurement;

pub use event::{FileEvent, FileKey, SweepEvent};
pub use measurement::{AnalysisPayload, AnalysisStatus, MeasurementResult, ResultKey};

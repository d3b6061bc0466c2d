pub mod metrics;
pub mod pipeline;
pub mod submission;

pub use pipeline::{IntakeError, IntakePipeline};
pub use submission::{DeviceLocation, PinnedLocation, ReportSubmission};

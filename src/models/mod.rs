pub mod tolerance;
pub mod outcome;
pub mod probe;
pub mod report;

pub use tolerance::ToleranceParameter;
pub use outcome::{SimulationOutcome, Verdict};
pub use probe::{CheckKind, ExecutionMode, ProbeContext, ProbePolicy, ProbeStage};
pub use report::CheckReport;

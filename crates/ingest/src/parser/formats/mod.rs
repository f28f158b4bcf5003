/// Per-dialect line assemblers

pub mod bracket;
pub mod datadog;
pub mod homer;

pub use bracket::BracketAssembler;
pub use datadog::DatadogAssembler;
pub use homer::HomerAssembler;

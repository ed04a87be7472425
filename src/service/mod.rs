//! Services: business operations composed from repository calls, wrapped by an explicit pipeline.

pub mod example;
pub mod pipeline;
pub mod validation;

pub use example::{ExampleQuery, ExampleService};
pub use pipeline::{ExceptionsConfig, LogConfig, OperationPipeline, RetryConfig, RetryContext, TimingConfig};

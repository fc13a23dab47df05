pub mod accounts;
pub mod jobs;
pub mod producer;
pub mod worker;

pub use jobs::{JobOutcome, JobProcessor};
pub use producer::{AnalysisProducer, OpenAiProducer};
pub use worker::{TriggerOutcome, WorkerPool};

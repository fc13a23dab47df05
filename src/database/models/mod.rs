pub mod analysis;
pub mod job;
pub mod user;

pub use analysis::{Analysis, NewAnalysis, PublicReport};
pub use job::{Job, JobCompletion, JobView, NewJob, RecoveredJobs};
pub use user::{NewUser, User, UserProfile};

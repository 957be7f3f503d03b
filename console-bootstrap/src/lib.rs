pub mod types;
pub mod transport;
pub mod session;
pub mod extractor;
pub mod orchestrator;

pub use types::*;
pub use transport::{ConsoleResponse, Transport};
pub use session::login;
pub use extractor::{extract, ExtractionRule, FormState, RuleSet};
pub use orchestrator::{Bootstrapper, RetrySchedule, ScheduleState, SubmissionPayload};

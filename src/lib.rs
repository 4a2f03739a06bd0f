pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod risk;
pub mod submission;
pub mod transport;
pub mod ui;

pub use config::{Config, ConfigOverrides};
pub use error::{ClientError, FailureKind, Result};
pub use events::{Subscription, Trigger};
pub use form::{FormSnapshot, FormSource};
pub use risk::{NumberFormat, RiskFormatter, RiskResult};
pub use submission::{HandlerSettings, SubmissionHandle, SubmissionHandler, SubmissionOutcome};
pub use transport::{HttpTransport, ScoringTransport, TransportResponse};
pub use ui::{ERROR_NOTICE_TEXT, MemoryView, ResultsView, UiState};

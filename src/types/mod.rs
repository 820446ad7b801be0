pub mod error;
pub mod estimate;
pub mod ticket;
pub mod utils;

pub use error::{
    AppError, ErrorCategory, ErrorClassifier, EstimateError, ProviderError, Result, ResultExt,
};
pub use estimate::{EstimateResult, Level, Phase, Reasoning};
pub use ticket::{
    EstimateSummary, NewTicket, ProgressEntry, Ticket, TicketDraft, TicketStatus, TicketUpdate,
};
pub use utils::{capitalize_first, log_filter_warn, truncate_chars};

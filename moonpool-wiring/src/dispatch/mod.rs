//! Per-type dispatch tables and the dispatcher hot path.

mod dispatcher;
mod table;
mod validation;

pub use dispatcher::{Dispatched, Dispatcher, LoggingSink, UnhandledSink};
pub use table::{DispatchTable, Fallback};
pub use validation::{AcceptAll, Validator, Violation};

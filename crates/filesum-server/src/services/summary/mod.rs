pub mod controller;
pub mod messages;
pub mod state;

pub use controller::SummaryController;
pub use state::{transition, Effect, FlowEvent, SessionState, Transition, TriggerRules};

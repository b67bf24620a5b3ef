//! Conversation state machine.
//!
//! `UserState` names where a learner is; the transition table says where
//! they may go next. Nothing here performs I/O.

mod transitions;
mod user_state;

pub use transitions::{is_valid_transition, table, StateTransition};
pub use user_state::{Phase, UserState};

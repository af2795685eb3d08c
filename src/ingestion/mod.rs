//! Session state and the inputs that drive it: live events, pending
//! registrations and periodic batched reads.

pub mod events;
pub mod poller;
pub mod session;

pub use events::{apply_event, register_pending, EventContext, EventOutcome, PendingRegistration};
pub use poller::{poll_once, run_poller, PollError};
pub use session::{
    spawn_session, PositionSession, SessionCommand, SessionConfig, SessionError, SessionHandle,
    SessionView,
};

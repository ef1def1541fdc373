//! Service layer
//!
//! One service per phase of a run. Services own the business logic and
//! talk to the outside world only through the collaborator handles in
//! [`crate::context::Collaborators`].

mod discovery;
mod retriever;
mod submitter;
mod termination;

pub use discovery::{CoordinatorService, Located, TASKS_PER_WORKER_VAR, build_payload};
pub use retriever::Retriever;
pub use submitter::{KeySource, MAX_KEY_ATTEMPTS, Submitter};
pub use termination::{TerminationHandler, write_stats};

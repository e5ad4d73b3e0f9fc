//! Agent core: lifecycle and the polling loop.

pub mod agent_loop;
pub mod factory;
pub mod state;

pub use agent_loop::{Agent, AgentStatus, StartOutcome, StopOutcome};
pub use factory::{CollaboratorFactory, Collaborators, EnvCollaboratorFactory};
pub use state::{AgentState, RECENT_CAPACITY, RunState};

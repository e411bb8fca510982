//! Domain models for the gig-economy simulator

pub mod agent;
pub mod contract;
pub mod network;
pub mod population;

// Re-exports
pub use agent::{Agent, AgentId, AgentState, AgentStatus, AttributeValue, Role};
pub use contract::{ComplianceStatus, Contract, EdgeKey};
pub use network::{NetworkError, NetworkRule, RelationshipNetwork};
pub use population::Population;

pub mod agents;
pub mod context;
pub mod outlet;
pub mod stage_agent;
pub mod types;
pub mod workflow;

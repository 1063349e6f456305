// Application layer - Workflow use cases
pub mod compute_client;
pub mod error;
pub mod plot_orchestrator;
#[cfg(test)]
pub mod testing;
pub mod workflow_service;

//! Graph state aggregates
//!
//! The node registry of one object graph and the manager that coordinates
//! recording of local changes with merging of external ones.

pub mod graph_map;
pub mod state_manager;

pub use graph_map::GraphMap;
pub use state_manager::GraphStateManager;

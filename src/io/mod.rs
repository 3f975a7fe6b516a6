//! Side-effecting collaborators for the agent loop.

pub mod analysis;
pub mod config;
pub mod model;
pub mod presets;
pub mod prompt;
pub mod pymol;
pub mod session;

// Sync sweep coordination and the shared counters it maintains.

pub mod coordinator;
pub mod state;

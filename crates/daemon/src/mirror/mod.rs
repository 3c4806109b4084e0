// Bare mirrors on disk: discovery, reachability, fetch, per-mirror update.

pub mod fetch;
pub mod probe;
pub mod remote;
pub mod scanner;
pub mod updater;

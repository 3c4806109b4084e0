// Cluster-wide mirror total: poll the configured peers and sum their counts.

pub mod counter;
pub mod peer;

// HTTP payloads exchanged between gitcache nodes.

pub mod broadcast;
pub mod info;

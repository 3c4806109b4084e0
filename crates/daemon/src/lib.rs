// gitcache-daemon library entry point.

pub mod cluster;
pub mod config;
pub mod mirror;
pub mod notify;
pub mod report;
pub mod runtime;
pub mod schedule;
pub mod server;
pub mod service;
pub mod supervise;
pub mod sync;

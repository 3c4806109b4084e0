// gitcache-common: wire types shared by the daemon and the CLI.

pub mod node;
pub mod protocol;

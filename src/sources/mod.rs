pub mod remote;
pub mod watch;

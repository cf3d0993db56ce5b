pub mod bluez;
pub mod constants;
pub mod registry;
pub mod remote;
pub mod transport;
pub mod types;

pub mod controls;
pub mod notify;
pub mod rofi;
pub mod types;

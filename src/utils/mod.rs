pub mod buffers;
pub mod config;
pub mod weapondb;

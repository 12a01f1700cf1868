pub mod commands;
pub mod messages;
pub mod replicated;
pub mod server_state;
pub mod weapon;

pub type PlayerId = u32;
pub type WeaponId = u32;

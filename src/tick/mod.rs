pub mod scheduler;
pub mod weapon_tick;

use serde::Deserialize;
use std::path::Path;
use crate::domain::collaborators::AimBonuses;

/// Default config file, overridable with `WEAPONSERVER_CONFIG`
pub const CONFIG_PATH: &str = "weaponserver.json";

/// Server configuration - immutable after load
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_port: u16,
    pub udp_port: u16,
    pub log_level: String,
    pub log_file: String,
    pub player_inactivity_timeout_secs: u64,
    pub max_weapons: usize,
    pub command_queue_capacity: usize,

    // Destruction countdown granularity
    pub destroy_tick_ms: u64,

    // Server-driven animation keyframes (bots / headless play)
    pub server_keyframes: bool,
    pub shot_keyframe_ms: u64,
    pub fire_cycle_ms: u64,
    pub reload_step_ms: u64,

    /// Stat bonuses granted to every player while aiming
    pub aim_bonuses: AimBonuses,

    // Hitscan world
    pub hit_radius: f32,
    pub arena_half_extent: f32,

    /// Fixed seed for the scatter RNG, entropy when absent
    pub rng_seed: Option<u64>,

    /// Only this address may report trigger-volume contacts, any when absent
    pub contact_source: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            udp_port: 8081,
            log_level: "debug".to_string(),
            log_file: "weaponserver.log".to_string(),
            player_inactivity_timeout_secs: 15,
            max_weapons: 1000,
            command_queue_capacity: 256,
            destroy_tick_ms: 1000,
            server_keyframes: false,
            shot_keyframe_ms: 50,
            fire_cycle_ms: 150,
            reload_step_ms: 500,
            aim_bonuses: AimBonuses { recoil: 0.3, view_range: 0.2, accuracy: 0.2 },
            hit_radius: 0.5,
            arena_half_extent: 50.0,
            rng_seed: None,
            contact_source: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Resolve the config path from the environment
    pub fn path_from_env() -> String {
        std::env::var("WEAPONSERVER_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string())
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

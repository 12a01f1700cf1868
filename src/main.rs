use std::sync::Arc;
use weaponserver::domain::hitscan::RosterPhysics;
use weaponserver::server;
use weaponserver::state::server_state::ServerState;
use weaponserver::utils::config::Config;
use weaponserver::utils::weapondb::WeaponDb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = Config::path_from_env();
    let config = Arc::new(Config::load_or_default(&config_path)?);
    setup_logging(&config)?;
    log::info!("Configuration loaded from {}", config_path);

    // Load immutable globals (zero contention)
    let weapons = Arc::new(WeaponDb::load());

    // Create server state (partitioned by weapon)
    let state = Arc::new(ServerState::new());
    let physics = Arc::new(RosterPhysics::new(state.clone(), config.hit_radius, config.arena_half_extent));

    // Create UDP socket shared by the weapon actors
    let udp_socket = Arc::new(
        tokio::net::UdpSocket::bind(format!("0.0.0.0:{}", config.udp_port)).await?
    );
    log::info!("UDP socket bound to port {}", config.udp_port);

    // Seed the world with one weapon
    let weapon_id = server::spawn_weapon_with_tick(
        state.clone(),
        WeaponDb::default_weapon_id(),
        &weapons,
        config.clone(),
        physics.clone(),
        udp_socket.clone(),
    )?;
    log::info!("Spawned demo weapon {}", weapon_id);

    // Start HTTP and UDP servers
    server::start_servers(state, weapons, config, udp_socket, physics).await?;

    Ok(())
}

fn setup_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Utc::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(config.log_level_filter())
        .chain(std::io::stdout())
        .chain(fern::log_file(&config.log_file)?)
        .apply()?;
    Ok(())
}

use room_server::api;
use room_server::config::{Config, LogFormat, LoggingConfig};
use room_server::rooms::RoomServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("room-server: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    let room_server = RoomServer::spawn(config.game.clone());
    let routes = api::room_routes::routes(room_server, config.game.clone(), &config.server.cors_origin);

    let (ip, port) = config.bind_address();
    tracing::info!(
        host = %config.server.host,
        port = port,
        cors_origin = %config.server.cors_origin,
        evict_empty_rooms = config.game.evict_empty_rooms,
        reshuffle_on_restart = config.game.reshuffle_on_restart,
        "Room server listening"
    );

    warp::serve(routes).run((ip, port)).await;
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|e| {
        eprintln!("room-server: invalid RUST_LOG '{}' ({}), using 'info'", logging.filter, e);
        EnvFilter::new("info")
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

use std::convert::Infallible;

use serde::Serialize;
use warp::Filter;

use super::room_websocket;
use crate::config::GameConfig;
use crate::rooms::{RoomServer, ServerStats};

const SERVICE_NAME: &str = "Room Server";

/// Every route the server exposes, with CORS applied.
pub fn routes(
    room_server: RoomServer,
    game: GameConfig,
    cors_origin: &str,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    room_websocket_route(room_server.clone())
        .or(room_health_check(room_server))
        .or(room_config_endpoint(game))
        .with(cors(cors_origin))
}

pub fn room_websocket_route(
    room_server: RoomServer,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("room")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_room_server(room_server))
        .map(|ws: warp::ws::Ws, room_server: RoomServer| {
            ws.on_upgrade(move |websocket| room_websocket::handle_room_websocket(websocket, room_server))
        })
}

/// Body of `GET /room/health`. Stats are omitted when the engine is gone.
#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    #[serde(flatten)]
    stats: Option<ServerStats>,
}

/// Body of `GET /room/config`.
#[derive(Debug, Serialize)]
struct ConfigReport<'a> {
    #[serde(flatten)]
    game: &'a GameConfig,
    seeded_roles: bool,
}

pub fn room_health_check(
    room_server: RoomServer,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "health")
        .and(warp::get())
        .and(with_room_server(room_server))
        .and_then(|room_server: RoomServer| async move {
            let report = match room_server.stats().await {
                Ok(stats) => HealthReport {
                    status: "healthy",
                    service: SERVICE_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    stats: Some(stats),
                },
                Err(e) => {
                    tracing::error!(error = %e, "Health check could not reach room engine");
                    HealthReport {
                        status: "unavailable",
                        service: SERVICE_NAME,
                        version: env!("CARGO_PKG_VERSION"),
                        stats: None,
                    }
                }
            };
            Ok::<_, Infallible>(warp::reply::json(&report))
        })
}

pub fn room_config_endpoint(
    game: GameConfig,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("room" / "config")
        .and(warp::get())
        .map(move || {
            warp::reply::json(&ConfigReport {
                game: &game,
                seeded_roles: game.role_seed.is_some(),
            })
        })
}

fn cors(origin: &str) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    if origin == "*" {
        builder.allow_any_origin()
    } else {
        builder.allow_origin(origin)
    }
}

fn with_room_server(
    room_server: RoomServer,
) -> impl Filter<Extract = (RoomServer,), Error = Infallible> + Clone {
    warp::any().map(move || room_server.clone())
}

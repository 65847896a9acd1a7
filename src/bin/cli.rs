// Room Server CLI Validation Tool
// Drives a running room server over HTTP and WebSocket

use clap::{Parser, Subcommand};
use colored::*;
use futures::{SinkExt, StreamExt};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::io::{self, Write};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use room_server::rooms::{ClientMessage, Role, RoomStatus, ServerMessage};

const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser)]
#[command(name = "room-cli")]
#[command(about = "Room Server CLI Validation Tool", long_about = None)]
struct Cli {
    /// Server address (default: 127.0.0.1:3001)
    #[arg(short, long, default_value = "127.0.0.1:3001")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Get server game configuration
    Config,

    /// Test WebSocket connection
    Connect,

    /// Generate a fresh room id
    NewRoom,

    /// Join a room's lobby
    Join {
        /// Room ID to join
        #[arg(short, long)]
        room_id: String,

        /// Username to join as
        #[arg(short, long)]
        username: String,

        /// Keep connection alive and print room updates (press Ctrl+C to exit)
        #[arg(short, long)]
        keep_alive: bool,
    },

    /// Join a room and start its game
    Start {
        /// Room ID to start
        #[arg(short, long)]
        room_id: String,

        /// Username to join as before starting
        #[arg(short, long)]
        username: String,
    },

    /// Show a room's status
    Status {
        /// Room ID to inspect
        #[arg(short, long)]
        room_id: String,
    },

    /// Run automated validation scenarios
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(short, long)]
        scenario: Option<String>,
    },

    /// Interactive mode - send custom messages
    Interactive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Config => {
            check_config(&cli.server).await;
        }
        Commands::Connect => {
            test_connection(&cli.server).await;
        }
        Commands::NewRoom => {
            println!("{} {}", "Room ID:".bold(), new_room_id().green().bold());
        }
        Commands::Join {
            room_id,
            username,
            keep_alive,
        } => {
            join_room(&cli.server, room_id, username, *keep_alive).await;
        }
        Commands::Start { room_id, username } => {
            start_game(&cli.server, room_id, username).await;
        }
        Commands::Status { room_id } => {
            room_status(&cli.server, room_id).await;
        }
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&cli.server).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive => {
            interactive_mode(&cli.server).await;
        }
    }
}

/// Six alphanumeric characters, the same shape the web entry page uses.
fn new_room_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

/// One WebSocket connection speaking the room protocol.
struct Session {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Session {
    async fn open(server: &str) -> Result<Self, String> {
        let url = format!("ws://{}/room", server);
        let (ws, _) = connect_async(&url)
            .await
            .map_err(|e| format!("cannot connect to {}: {}", url, e))?;
        Ok(Self { ws })
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), String> {
        let text = serde_json::to_string(message).map_err(|e| e.to_string())?;
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| format!("failed to send {}: {}", message.name(), e))
    }

    /// Next protocol message, or None on timeout or close.
    async fn recv(&mut self, wait: Duration) -> Option<ServerMessage> {
        timeout(wait, self.listen()).await.ok().flatten()
    }

    /// Next protocol message, or None once the socket closes.
    async fn listen(&mut self) -> Option<ServerMessage> {
        while let Some(frame) = self.ws.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                    Ok(message) => return Some(message),
                    Err(_) => println!("{} Unrecognised frame: {}", "?".yellow(), text),
                },
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
        None
    }

    /// Waits for the first message matching `pred`, skipping others.
    async fn wait_for<F>(&mut self, what: &str, pred: F) -> Result<ServerMessage, String>
    where
        F: Fn(&ServerMessage) -> bool,
    {
        while let Some(message) = self.recv(REPLY_TIMEOUT).await {
            if pred(&message) {
                return Ok(message);
            }
        }
        Err(format!("timed out waiting for {}", what))
    }

    /// True if nothing arrives within `wait`.
    async fn is_quiet(&mut self, wait: Duration) -> bool {
        self.recv(wait).await.is_none()
    }

    async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

fn join(room_id: &str, username: &str) -> ClientMessage {
    ClientMessage::Join {
        room_id: room_id.to_string(),
        username: username.to_string(),
    }
}

fn print_message(message: &ServerMessage) {
    match message {
        ServerMessage::RoomView {
            room_id,
            participants,
            owner,
        } => {
            println!(
                "{} Room {} | owner: {} | participants: {}",
                "◀".green(),
                room_id.bold(),
                owner.as_deref().unwrap_or("none").cyan(),
                participants.join(", ")
            );
        }
        ServerMessage::JoinRejected { room_id, reason } => {
            println!("{} Join to {} rejected: {}", "✗".red(), room_id, reason);
        }
        ServerMessage::GameStarted { room_id } => {
            println!("{} Game started in room {}", "◀".green(), room_id.bold());
        }
        ServerMessage::RolesAssigned { roles, .. } => {
            println!("{} Roles assigned:", "◀".green());
            for entry in roles {
                let role = match entry.role {
                    Role::Questioner => "Questioner".magenta().bold(),
                    Role::Answerer => "Answerer".normal(),
                };
                println!("    {} {}", entry.username, role);
            }
        }
        ServerMessage::WhoAmIReply { username } => {
            println!("{} You are: {}", "◀".green(), username.as_deref().unwrap_or("(not joined)"));
        }
        ServerMessage::StatusReply {
            room_id,
            status,
            owner,
            participants,
        } => {
            println!("{} Room {} is {}", "◀".green(), room_id.bold(), status.to_string().cyan());
            println!("  Owner: {}", owner.as_deref().unwrap_or("none"));
            for entry in participants {
                println!("    {} ({:?})", entry.username, entry.role);
            }
        }
        ServerMessage::CommandRejected { reason } => {
            println!("{} Command rejected: {}", "✗".yellow(), reason);
        }
        ServerMessage::Error { message } => {
            println!("{} Server error: {}", "✗".red(), message);
        }
    }
}

async fn check_health(server: &str) {
    println!("{}", "Checking server health...".cyan());

    let url = format!("http://{}/room/health", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                println!("{} Health check passed", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
                    println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
                    println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
                    println!("  Rooms: {}", body["rooms"]);
                    println!("  Connections: {}", body["connections"]);
                }
            } else {
                println!("{} Health check failed: {}", "✗".red(), status);
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn check_config(server: &str) {
    println!("{}", "Fetching server configuration...".cyan());

    let url = format!("http://{}/room/config", server);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            if resp.status().is_success() {
                println!("{} Config endpoint accessible", "✓".green());

                if let Ok(body) = resp.json::<serde_json::Value>().await {
                    println!("\nConfiguration:");
                    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
                }
            } else {
                println!("{} Config fetch failed: {}", "✗".red(), resp.status());
            }
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

async fn test_connection(server: &str) {
    println!("{}", "Testing WebSocket connection...".cyan());

    match Session::open(server).await {
        Ok(session) => {
            println!("{} WebSocket connection established", "✓".green());
            session.close().await;
            println!("{} Connection closed cleanly", "✓".green());
        }
        Err(e) => {
            println!("{} WebSocket connection failed: {}", "✗".red(), e);
        }
    }
}

async fn join_room(server: &str, room_id: &str, username: &str, keep_alive: bool) {
    println!("{}", "Joining room...".cyan());
    println!("  Room ID: {}", room_id);
    println!("  Username: {}", username);

    let mut session = match Session::open(server).await {
        Ok(session) => session,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return;
        }
    };

    if let Err(e) = session.send(&join(room_id, username)).await {
        println!("{} {}", "✗".red(), e);
        return;
    }

    match session.recv(REPLY_TIMEOUT).await {
        Some(message) => print_message(&message),
        None => {
            println!("{} No response from server", "✗".red());
            return;
        }
    }

    if keep_alive {
        println!("\n{}", "Connection is being kept alive...".yellow());
        println!("Press {} to leave the room.", "Ctrl+C".bold());

        loop {
            tokio::select! {
                message = session.listen() => match message {
                    Some(message) => print_message(&message),
                    None => {
                        println!("\n{} Connection closed by server", "✗".red());
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    let _ = session.send(&ClientMessage::Leave).await;
                    println!("\n{} Left room {}", "✓".green(), room_id);
                    break;
                }
            }
        }
    } else {
        println!("\n{}", "⚠ Note: Connection closed, you have left the room.".yellow());
        println!("Use {} to stay in the room.", "--keep-alive".cyan());
    }

    session.close().await;
}

async fn start_game(server: &str, room_id: &str, username: &str) {
    println!("{}", "Starting game...".cyan());

    let mut session = match Session::open(server).await {
        Ok(session) => session,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return;
        }
    };

    let commands = [
        join(room_id, username),
        ClientMessage::StartGame {
            room_id: room_id.to_string(),
        },
    ];
    for command in &commands {
        if let Err(e) = session.send(command).await {
            println!("{} {}", "✗".red(), e);
            return;
        }
    }

    while let Some(message) = session.recv(REPLY_TIMEOUT).await {
        print_message(&message);
        if matches!(message, ServerMessage::RolesAssigned { .. } | ServerMessage::JoinRejected { .. }) {
            break;
        }
    }

    session.close().await;
}

async fn room_status(server: &str, room_id: &str) {
    let mut session = match Session::open(server).await {
        Ok(session) => session,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return;
        }
    };

    let request = ClientMessage::GetStatus {
        room_id: room_id.to_string(),
    };
    if let Err(e) = session.send(&request).await {
        println!("{} {}", "✗".red(), e);
        return;
    }

    match session.recv(REPLY_TIMEOUT).await {
        Some(message) => print_message(&message),
        None => println!("{} Room {} does not exist", "✗".yellow(), room_id),
    }

    session.close().await;
}

const SCENARIOS: &[(&str, &str)] = &[
    ("connection", "Basic WebSocket connection test"),
    ("lobby", "Join, duplicate join, and owner succession on leave"),
    ("start-game", "Game start and role assignment"),
    ("late-join", "Join rejected once the game is playing"),
    ("status", "Status query is answered privately"),
    ("who-am-i", "Connection identity query"),
    ("invalid-message", "Malformed frames are rejected at the boundary"),
];

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    for (name, description) in SCENARIOS {
        println!("  {} - {}", name.cyan(), description);
    }
    println!("\nExample: room-cli validate --scenario lobby");
}

async fn run_scenario(server: &str, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let Some(result) = execute_scenario(server, scenario).await else {
        println!("{} Unknown scenario: {}", "✗".red(), scenario);
        list_scenarios();
        return;
    };

    match result {
        Ok(()) => println!("\n{} Scenario passed", "✓".green().bold()),
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            println!("\n{} Scenario failed", "✗".red().bold());
        }
    }
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let mut passed = 0;
    let mut failed = 0;

    for (scenario, _) in SCENARIOS {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        match execute_scenario(server, scenario).await {
            Some(Ok(())) => {
                println!("{} {}", "✓".green(), "passed".green());
                passed += 1;
            }
            Some(Err(e)) => {
                println!("{} {}", "✗".red(), e);
                failed += 1;
            }
            None => {}
        }
    }

    println!("\n{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed! 🎉".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn execute_scenario(server: &str, scenario: &str) -> Option<Result<(), String>> {
    let result = match scenario {
        "connection" => validate_connection(server).await,
        "lobby" => validate_lobby(server).await,
        "start-game" => validate_start_game(server).await,
        "late-join" => validate_late_join(server).await,
        "status" => validate_status(server).await,
        "who-am-i" => validate_who_am_i(server).await,
        "invalid-message" => validate_invalid_message(server).await,
        _ => return None,
    };
    Some(result)
}

fn is_view_of(expected: &[&str], owner: &str) -> impl Fn(&ServerMessage) -> bool {
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    let owner = owner.to_string();
    move |message| {
        matches!(message, ServerMessage::RoomView { participants, owner: Some(o), .. }
            if *participants == expected && *o == owner)
    }
}

async fn validate_connection(server: &str) -> Result<(), String> {
    let session = Session::open(server).await?;
    println!("{} WebSocket connection successful", "✓".green());
    session.close().await;
    Ok(())
}

async fn validate_lobby(server: &str) -> Result<(), String> {
    let room_id = new_room_id();
    println!("  Room: {}", room_id);

    let mut alice = Session::open(server).await?;
    let mut bob = Session::open(server).await?;

    println!("  Step 1: alice creates the room...");
    alice.send(&join(&room_id, "alice")).await?;
    alice.wait_for("alice's view", is_view_of(&["alice"], "alice")).await?;
    println!("{} alice owns the room", "✓".green());

    println!("  Step 2: bob joins, alice joins again...");
    bob.send(&join(&room_id, "bob")).await?;
    bob.wait_for("bob's view", is_view_of(&["alice", "bob"], "alice")).await?;
    alice.send(&join(&room_id, "alice")).await?;
    alice
        .wait_for("duplicate join view", is_view_of(&["alice", "bob"], "alice"))
        .await?;
    println!("{} Duplicate join kept a single entry", "✓".green());

    println!("  Step 3: alice leaves...");
    alice.send(&ClientMessage::Leave).await?;
    bob.wait_for("succession view", is_view_of(&["bob"], "bob")).await?;
    println!("{} Ownership passed to bob", "✓".green());

    alice.close().await;
    bob.close().await;
    Ok(())
}

async fn validate_start_game(server: &str) -> Result<(), String> {
    let room_id = new_room_id();
    let mut alice = Session::open(server).await?;
    let mut bob = Session::open(server).await?;

    alice.send(&join(&room_id, "alice")).await?;
    alice.wait_for("alice's view", is_view_of(&["alice"], "alice")).await?;
    bob.send(&join(&room_id, "bob")).await?;
    alice.wait_for("two-member view", is_view_of(&["alice", "bob"], "alice")).await?;
    bob.wait_for("two-member view", is_view_of(&["alice", "bob"], "alice")).await?;

    alice
        .send(&ClientMessage::StartGame {
            room_id: room_id.clone(),
        })
        .await?;

    for session in [&mut alice, &mut bob] {
        session
            .wait_for("GameStarted", |m| matches!(m, ServerMessage::GameStarted { .. }))
            .await?;
        let roles = session
            .wait_for("RolesAssigned", |m| matches!(m, ServerMessage::RolesAssigned { .. }))
            .await?;
        if let ServerMessage::RolesAssigned { roles, .. } = roles {
            let questioners = roles.iter().filter(|r| r.role == Role::Questioner).count();
            if questioners != 1 {
                return Err(format!("expected one Questioner, got {}", questioners));
            }
        }
    }
    println!("{} Both members saw the start and exactly one Questioner", "✓".green());

    alice.close().await;
    bob.close().await;
    Ok(())
}

async fn validate_late_join(server: &str) -> Result<(), String> {
    let room_id = new_room_id();
    let mut bob = Session::open(server).await?;
    let mut carol = Session::open(server).await?;

    bob.send(&join(&room_id, "bob")).await?;
    bob.send(&ClientMessage::StartGame {
        room_id: room_id.clone(),
    })
    .await?;
    bob.wait_for("RolesAssigned", |m| matches!(m, ServerMessage::RolesAssigned { .. }))
        .await?;

    carol.send(&join(&room_id, "carol")).await?;
    carol
        .wait_for("JoinRejected", |m| matches!(m, ServerMessage::JoinRejected { .. }))
        .await?;
    println!("{} carol was rejected", "✓".green());

    if !bob.is_quiet(Duration::from_millis(500)).await {
        return Err("bob received a broadcast for a rejected join".to_string());
    }
    println!("{} bob saw nothing", "✓".green());

    bob.close().await;
    carol.close().await;
    Ok(())
}

async fn validate_status(server: &str) -> Result<(), String> {
    let room_id = new_room_id();
    let mut bob = Session::open(server).await?;
    let mut observer = Session::open(server).await?;

    bob.send(&join(&room_id, "bob")).await?;
    bob.wait_for("bob's view", is_view_of(&["bob"], "bob")).await?;

    observer
        .send(&ClientMessage::GetStatus {
            room_id: room_id.clone(),
        })
        .await?;
    let reply = observer
        .wait_for("StatusReply", |m| matches!(m, ServerMessage::StatusReply { .. }))
        .await?;
    if let ServerMessage::StatusReply { status, participants, .. } = &reply {
        if *status != RoomStatus::Lobby || participants.len() != 1 {
            return Err(format!("unexpected status reply {:?}", reply));
        }
    }
    print_message(&reply);

    if !bob.is_quiet(Duration::from_millis(500)).await {
        return Err("status query leaked to room members".to_string());
    }

    observer
        .send(&ClientMessage::GetStatus {
            room_id: new_room_id(),
        })
        .await?;
    if !observer.is_quiet(Duration::from_millis(500)).await {
        return Err("status for an unknown room produced a reply".to_string());
    }
    println!("{} Unknown room ignored silently", "✓".green());

    bob.close().await;
    observer.close().await;
    Ok(())
}

async fn validate_who_am_i(server: &str) -> Result<(), String> {
    let room_id = new_room_id();
    let mut session = Session::open(server).await?;

    session.send(&ClientMessage::WhoAmI).await?;
    session
        .wait_for("anonymous reply", |m| *m == ServerMessage::WhoAmIReply { username: None })
        .await?;

    session.send(&join(&room_id, "dave")).await?;
    session.send(&ClientMessage::WhoAmI).await?;
    session
        .wait_for("bound reply", |m| {
            *m == ServerMessage::WhoAmIReply {
                username: Some("dave".to_string()),
            }
        })
        .await?;
    println!("{} Identity follows the binding", "✓".green());

    session.close().await;
    Ok(())
}

async fn validate_invalid_message(server: &str) -> Result<(), String> {
    let mut session = Session::open(server).await?;

    session
        .ws
        .send(Message::Text(r#"{"type":"Teleport"}"#.to_string()))
        .await
        .map_err(|e| e.to_string())?;
    session
        .wait_for("Error", |m| matches!(m, ServerMessage::Error { .. }))
        .await?;

    session.send(&join("", "nobody")).await?;
    session
        .wait_for("Error", |m| matches!(m, ServerMessage::Error { .. }))
        .await?;
    println!("{} Malformed frames answered with errors", "✓".green());

    session.close().await;
    Ok(())
}

async fn interactive_mode(server: &str) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let url = format!("ws://{}/room", server);

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            println!("{} Connected to server", "✓".green());

            let (mut write, mut read) = ws_stream.split();

            let receive_task = tokio::spawn(async move {
                while let Some(Ok(msg)) = read.next().await {
                    if let Message::Text(text) = msg {
                        println!("\n{} {}", "◀".green(), text.bright_white());
                    }
                }
            });

            loop {
                print!("{} ", "►".cyan());
                let _ = io::stdout().flush();

                let mut input = String::new();
                if io::stdin().read_line(&mut input).is_err() {
                    break;
                }

                let input = input.trim();

                if input.is_empty() {
                    continue;
                }

                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                if input == "help" {
                    print_interactive_help();
                    continue;
                }

                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(input) {
                    if write.send(Message::Text(parsed.to_string())).await.is_ok() {
                        println!("{} Message sent", "✓".green());
                    } else {
                        println!("{} Failed to send message", "✗".red());
                        break;
                    }
                } else {
                    println!("{} Invalid JSON. Type 'help' for examples.", "✗".yellow());
                }
            }

            receive_task.abort();
        }
        Err(e) => {
            println!("{} Cannot connect to server: {}", "✗".red(), e);
        }
    }
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("Send JSON messages directly to the server.\n");

    println!("{}", "Example Messages:".bold());
    println!("\n{}:", "Join".cyan());
    println!(r#"  {{"type":"Join","room_id":"a1B2c3","username":"alice"}}"#);

    println!("\n{}:", "Rejoin from the game view".cyan());
    println!(r#"  {{"type":"RejoinForGame","room_id":"a1B2c3","username":"alice"}}"#);

    println!("\n{}:", "Start / Reshuffle".cyan());
    println!(r#"  {{"type":"StartGame","room_id":"a1B2c3"}}"#);
    println!(r#"  {{"type":"Reshuffle","room_id":"a1B2c3"}}"#);

    println!("\n{}:", "Queries".cyan());
    println!(r#"  {{"type":"WhoAmI"}}"#);
    println!(r#"  {{"type":"GetStatus","room_id":"a1B2c3"}}"#);

    println!("\n{}:", "Leave".cyan());
    println!(r#"  {{"type":"Leave"}}"#);

    println!("\n{}: quit, exit", "Commands".bold());
    println!();
}

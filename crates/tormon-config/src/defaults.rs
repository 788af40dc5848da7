//! Default values shared by the CLI and the configuration model.

/// Listening port used when none (or an out-of-range one) is given.
pub const DEFAULT_PORT: u16 = 6881;
/// Interface accepting incoming peer connections.
pub const DEFAULT_LISTEN_INTERFACE: &str = "0.0.0.0";
/// Directory receiving downloaded payload and resume files.
pub const DEFAULT_SAVE_PATH: &str = "./output/";
/// Peer connection cap applied to every admitted torrent.
pub const DEFAULT_MAX_CONNECTIONS: i32 = 60;
/// Dashboard refresh interval in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 500;
/// Sentinel the engine understands as "no limit".
pub const UNLIMITED: i64 = -1;

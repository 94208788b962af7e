//! Shared networking constants and helpers used by client and server.

/// Default TCP port the WebSocket feed listens on.
pub const DEFAULT_PORT: u16 = 3001;
/// Request path that accepts the WebSocket upgrade.
pub const WS_PATH: &str = "/ws";

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Build the `ws://` URL of the feed served at `server` (a `host:port` pair).
pub fn ws_url(server: &str) -> String {
    format!("ws://{}{}", server, WS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_feed_url() {
        assert_eq!(addr("127.0.0.1", DEFAULT_PORT), "127.0.0.1:3001");
        assert_eq!(ws_url("localhost:3001"), "ws://localhost:3001/ws");
    }
}

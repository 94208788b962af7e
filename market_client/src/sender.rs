//! Sending subscription commands to the feed server.
//!
//! This module provides a small helper for encoding `ClientMessage` frames and writing
//! them to the WebSocket.
use log::info;
use market_common::ClientMessage;
use market_common::MarketError;
use market_common::instruments::Instrument;
use std::io::{Read, Write};
use tungstenite::{Message, WebSocket};

/// Helper type for sending commands to the server.
pub struct CommandSender;

impl CommandSender {
    /// Build the frame for `instruments`; `subscribe` selects the event.
    pub fn command(instruments: &[Instrument], subscribe: bool) -> ClientMessage {
        let symbols = instruments.iter().map(|i| i.to_string()).collect();
        if subscribe {
            ClientMessage::Subscribe { symbols }
        } else {
            ClientMessage::Unsubscribe { symbols }
        }
    }

    /// Encode `command` as JSON and send it as a text frame.
    pub fn send_command<S: Read + Write>(
        socket: &mut WebSocket<S>,
        command: &ClientMessage,
    ) -> Result<(), MarketError> {
        let text = command.to_json()?;
        info!("Sending command: {}", text);
        socket.send(Message::Text(text))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_subscribe_and_unsubscribe_frames() {
        let instruments = [Instrument::RELIANCE, Instrument::NIFTY50];
        assert_eq!(
            CommandSender::command(&instruments, true).to_json().unwrap(),
            r#"{"event":"subscribe","symbols":["RELIANCE","NIFTY50"]}"#
        );
        assert_eq!(
            CommandSender::command(&instruments[..1], false),
            ClientMessage::Unsubscribe {
                symbols: vec!["RELIANCE".to_string()]
            }
        );
    }
}

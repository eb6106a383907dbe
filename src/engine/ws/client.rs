use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

use super::frame::{ClientFrame, ServerFrame, normalize};
use crate::utils::Result;

/// A small client for the WebSocket engine's frame protocol.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<ServerFrame>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self {
            stream,
            pending: VecDeque::new(),
        })
    }

    pub async fn send(&mut self, frame: &ClientFrame) -> Result<()> {
        let text = serde_json::to_string(frame)?;
        self.stream.send(WsMessage::text(text)).await?;
        Ok(())
    }

    /// Connects to `nsp` and waits for the engine's answer, either
    /// `connected` or `connect_error`. Unrelated frames stay queued.
    pub async fn join(&mut self, nsp: &str) -> Result<Option<ServerFrame>> {
        let nsp = normalize(nsp);
        self.send(&ClientFrame::Connect { nsp: nsp.clone() }).await?;

        loop {
            let Some(frame) = self.read_frame().await? else {
                return Ok(None);
            };
            let answered = matches!(
                &frame,
                ServerFrame::Connected { .. } | ServerFrame::ConnectError { .. }
            ) && frame.nsp() == nsp;
            if answered {
                return Ok(Some(frame));
            }
            self.pending.push_back(frame);
        }
    }

    pub async fn emit(&mut self, nsp: &str, event: &str, data: Vec<Value>) -> Result<()> {
        self.send(&ClientFrame::Event {
            nsp: normalize(nsp),
            event: event.to_string(),
            data,
        })
        .await
    }

    pub async fn leave(&mut self, nsp: &str) -> Result<()> {
        self.send(&ClientFrame::Disconnect {
            nsp: normalize(nsp),
        })
        .await
    }

    /// Next frame from the engine, or `None` once the connection is closed.
    pub async fn next_frame(&mut self) -> Result<Option<ServerFrame>> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        self.read_frame().await
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<ServerFrame>> {
        while let Some(msg) = self.stream.next().await {
            let msg = msg?;
            if msg.is_close() {
                return Ok(None);
            }
            if msg.is_text() {
                return Ok(Some(serde_json::from_str(msg.to_text()?)?));
            }
        }
        Ok(None)
    }
}

//! A real WebSocket transport for driving negotiators against a running
//! signaling server.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tandem_client::{SignalTransport, TransportConnector, TransportError, TransportEvent, TransportEventSink};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            url: format!("ws://{}/ws", addr),
        }
    }
}

#[async_trait(?Send)]
impl TransportConnector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, events: TransportEventSink) -> Result<WsTransport, TransportError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut writer, mut reader) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if writer.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        let reader_events = events.clone();
        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        reader_events.emit(TransportEvent::Message(text.as_str().to_string()));
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        reader_events.emit(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
            }
            reader_events.emit(TransportEvent::Closed);
        });

        events.emit(TransportEvent::Opened);
        Ok(WsTransport { tx })
    }
}

pub struct WsTransport {
    tx: mpsc::UnboundedSender<Message>,
}

impl SignalTransport for WsTransport {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(Message::Text(text.to_string().into()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

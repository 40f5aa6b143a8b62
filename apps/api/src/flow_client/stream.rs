//! Server-sent event subscription for streamed flow output.

use reqwest::{header::ACCEPT, Client, Url};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// One notification from a flow stream. `Closed` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Update(Value),
    Closed(String),
    Error(String),
}

/// Receiving end of a flow subscription. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct FlowEventStream {
    rx: mpsc::Receiver<FlowEvent>,
    cancel: CancellationToken,
}

impl FlowEventStream {
    /// Next event, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<FlowEvent> {
        self.rx.recv().await
    }

    /// Stops the background subscription. Buffered events can still be drained.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    #[cfg(test)]
    pub(crate) fn from_parts(rx: mpsc::Receiver<FlowEvent>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }
}

impl Drop for FlowEventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns the subscription task and returns its event stream.
pub(crate) fn subscribe(client: Client, url: Url, token: Option<String>) -> FlowEventStream {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let child = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = child.cancelled() => debug!("Flow stream cancelled"),
            _ = pump(client, url, token, tx) => {}
        }
    });

    FlowEventStream { rx, cancel }
}

async fn pump(client: Client, url: Url, token: Option<String>, tx: mpsc::Sender<FlowEvent>) {
    let mut request = client.get(url).header(ACCEPT, "text/event-stream");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let mut response = match request.send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            let _ = tx
                .send(FlowEvent::Error(format!("Stream returned {}", r.status())))
                .await;
            return;
        }
        Err(e) => {
            let _ = tx.send(FlowEvent::Error(e.to_string())).await;
            return;
        }
    };

    let mut buffer = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                push_chunk(&mut buffer, &chunk);
                while let Some(frame) = take_frame(&mut buffer) {
                    let Some(event) = frame_to_event(&frame) else {
                        continue;
                    };
                    let terminal = !matches!(event, FlowEvent::Update(_));
                    if tx.send(event).await.is_err() || terminal {
                        return;
                    }
                }
            }
            Ok(None) => {
                let _ = tx.send(FlowEvent::Closed("Stream closed".to_string())).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(FlowEvent::Error(e.to_string())).await;
                return;
            }
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct SseFrame {
    event: Option<String>,
    data: String,
}

/// Appends raw bytes with carriage returns dropped. Decoding waits for whole
/// frames so multi-byte characters split across chunks stay intact.
fn push_chunk(buffer: &mut Vec<u8>, chunk: &[u8]) {
    buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
}

/// Pops one complete (blank-line terminated) frame off the buffer.
fn take_frame(buffer: &mut Vec<u8>) -> Option<SseFrame> {
    let pos = buffer.windows(2).position(|w| w == b"\n\n")?;
    let bytes: Vec<u8> = buffer.drain(..pos + 2).collect();
    let raw = String::from_utf8_lossy(&bytes);

    let mut frame = SseFrame::default();
    let mut data_lines = Vec::new();
    for line in raw.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (name, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match name {
            "event" => frame.event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    frame.data = data_lines.join("\n");
    Some(frame)
}

fn frame_to_event(frame: &SseFrame) -> Option<FlowEvent> {
    match frame.event.as_deref() {
        Some("close") => Some(FlowEvent::Closed("Stream closed".to_string())),
        Some("error") => Some(FlowEvent::Error(frame.data.clone())),
        _ if frame.data.is_empty() => None,
        _ => match serde_json::from_str(&frame.data) {
            Ok(value) => Some(FlowEvent::Update(value)),
            Err(e) => {
                warn!("Skipping malformed stream payload ({e}): {}", frame.data);
                None
            }
        },
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::logger;
use crate::models::envelope::Envelope;
use crate::models::settings::Settings;

/// Inbound envelopes are fanned out on a broadcast channel; a slow
/// consumer lags rather than blocking the socket task.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct RealtimeOptions {
    pub url: String,
    /// Appended as a `token` query parameter when present.
    pub token: Option<String>,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl RealtimeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.ws_url.clone(),
            token: settings.ws_token.clone(),
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
            backoff_max: Duration::from_millis(settings.backoff_max_ms),
        }
    }
}

enum Command {
    Frame(String),
    Close,
}

/// Reconnecting socket client for the `/ws` push channel.
///
/// Owned value with an explicit lifecycle: `connect` spawns the socket
/// task, `close` stops it for good. Between those, every disconnect is
/// followed by an exponential-backoff reconnect; there is no terminal
/// failure state. Connection errors never surface to consumers.
pub struct RealtimeClient {
    options: RealtimeOptions,
    closed: Arc<AtomicBool>,
    open: Arc<AtomicBool>,
    events: broadcast::Sender<Envelope>,
    outbound: Option<mpsc::UnboundedSender<Command>>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    pub fn new(options: RealtimeOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            options,
            closed: Arc::new(AtomicBool::new(false)),
            open: Arc::new(AtomicBool::new(false)),
            events,
            outbound: None,
            task: None,
        }
    }

    /// Spawns the socket task. Calling again after `close` restarts it.
    pub fn connect(&mut self) {
        if self.outbound.is_some() && self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        // A task that was just told to close may not have exited yet; it
        // must not keep running alongside its replacement, and the
        // replacement needs flags the old task cannot still flip.
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.closed = Arc::new(AtomicBool::new(false));
        self.open = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        let url = endpoint_url(&self.options);
        let task = tokio::spawn(run_loop(
            url,
            self.options.backoff_base,
            self.options.backoff_max,
            Arc::clone(&self.closed),
            Arc::clone(&self.open),
            self.events.clone(),
            rx,
        ));
        self.task = Some(task);
    }

    /// Stops reconnecting and closes the socket. Idempotent.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Command::Close);
        }
    }

    /// A fresh receiver of inbound envelopes.
    pub fn events(&self) -> broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Sends an envelope, auto-filling `v`, `id` and `ts` when absent.
    /// Returns false without queueing anything if the socket is not open.
    pub fn send(&self, mut envelope: Envelope) -> bool {
        if !self.is_open() {
            return false;
        }
        let Some(outbound) = self.outbound.as_ref() else {
            return false;
        };
        envelope.fill_defaults();
        let Ok(text) = serde_json::to_string(&envelope) else {
            return false;
        };
        outbound.send(Command::Frame(text)).is_ok()
    }

    pub fn subscribe(&self, room: &str) -> bool {
        let mut envelope = Envelope::new("subscribe");
        envelope.room = Some(room.to_string());
        self.send(envelope)
    }

    pub fn action(&self, room: &str, payload: serde_json::Value) -> bool {
        let mut envelope = Envelope::new("action");
        envelope.room = Some(room.to_string());
        envelope.payload = Some(payload);
        self.send(envelope)
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn endpoint_url(options: &RealtimeOptions) -> String {
    match &options.token {
        Some(token) if !token.is_empty() => {
            let separator = if options.url.contains('?') { '&' } else { '?' };
            format!("{}{}token={}", options.url, separator, token)
        }
        _ => options.url.clone(),
    }
}

/// Capped exponential backoff before jitter:
/// `min(max, base * 2^attempt)`.
fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(max)
}

fn jitter(base: Duration) -> Duration {
    let millis = base.as_millis() as u64;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..millis))
}

async fn run_loop(
    url: String,
    base: Duration,
    max: Duration,
    closed: Arc<AtomicBool>,
    open: Arc<AtomicBool>,
    events: broadcast::Sender<Envelope>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut attempt: u32 = 0;
    loop {
        if closed.load(Ordering::SeqCst) {
            break;
        }
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                // Successful open resets the backoff schedule.
                attempt = 0;
                open.store(true, Ordering::SeqCst);
                logger!(INFO, "[REALTIME] Connected to `{url}`");
                let (mut sink, mut source) = stream.split();
                loop {
                    tokio::select! {
                        command = commands.recv() => match command {
                            Some(Command::Frame(text)) => {
                                if sink.send(Message::text(text)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Command::Close) | None => {
                                let _ = sink.send(Message::Close(None)).await;
                                open.store(false, Ordering::SeqCst);
                                logger!(INFO, "[REALTIME] Closed by caller");
                                return;
                            }
                        },
                        inbound = source.next() => match inbound {
                            Some(Ok(Message::Text(text))) => {
                                // Unparseable frames are dropped; the
                                // connection stays open.
                                if let Ok(envelope) = serde_json::from_str::<Envelope>(text.as_str()) {
                                    let _ = events.send(envelope);
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = sink.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(_)) | None => break,
                        },
                    }
                }
                open.store(false, Ordering::SeqCst);
                logger!(WARN, "[REALTIME] Connection to `{url}` lost");
            }
            Err(error) => {
                logger!(WARN, "[REALTIME] Could not connect to `{url}` ({error})");
            }
        }
        if closed.load(Ordering::SeqCst) {
            break;
        }
        let delay = backoff_delay(attempt, base, max) + jitter(base);
        attempt = attempt.saturating_add(1);
        logger!(DEBUG, "[REALTIME] Reconnecting in {delay:?} (attempt {attempt})");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backoff_is_strictly_increasing_until_the_cap() {
        let base = Duration::from_millis(250);
        let max = Duration::from_millis(10_000);
        let delays: Vec<Duration> = (0..8).map(|a| backoff_delay(a, base, max)).collect();
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(delays[0], Duration::from_millis(250));
        assert_eq!(delays[1], Duration::from_millis(500));
        assert_eq!(delays[2], Duration::from_millis(1_000));
        // Capped, never beyond max
        assert_eq!(delays[7], max);
        assert_eq!(backoff_delay(30, base, max), max);
    }

    #[test]
    fn test_backoff_reset_returns_to_base_delay() {
        let base = Duration::from_millis(250);
        let max = Duration::from_millis(10_000);
        assert_eq!(backoff_delay(5, base, max), Duration::from_millis(8_000));
        // After one successful open the attempt counter is zeroed
        assert_eq!(backoff_delay(0, base, max), base);
    }

    #[test]
    fn test_jitter_stays_under_base() {
        let base = Duration::from_millis(250);
        for _ in 0..50 {
            assert!(jitter(base) < base);
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_endpoint_url_appends_token() {
        let mut options = RealtimeOptions {
            url: "ws://localhost:8000/ws".to_string(),
            token: Some("abc".to_string()),
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_millis(10_000),
        };
        assert_eq!(endpoint_url(&options), "ws://localhost:8000/ws?token=abc");
        options.url = "ws://localhost:8000/ws?room=daily".to_string();
        assert_eq!(
            endpoint_url(&options),
            "ws://localhost:8000/ws?room=daily&token=abc"
        );
        options.token = None;
        assert_eq!(endpoint_url(&options), "ws://localhost:8000/ws?room=daily");
    }

    #[tokio::test]
    async fn test_reconnects_after_abrupt_drop_and_stops_on_close() {
        use std::sync::atomic::AtomicUsize;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                // Finish the handshake, then hang up abruptly
                if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                    drop(ws);
                }
            }
        });

        let mut client = RealtimeClient::new(RealtimeOptions {
            url: format!("ws://{addr}/ws"),
            token: None,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
        });
        client.connect();

        // Every accept is a fresh connection; repeated accepts mean the
        // client kept scheduling reconnects after each server-side drop
        let mut waited_ms = 0;
        while accepted.load(Ordering::SeqCst) < 3 && waited_ms < 5_000 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited_ms += 10;
        }
        assert!(
            accepted.load(Ordering::SeqCst) >= 3,
            "client stopped reconnecting after abrupt drops"
        );

        client.close();
        // Let any in-flight attempt and the final backoff sleep drain
        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = accepted.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), settled);
    }

    #[tokio::test]
    async fn test_connect_after_close_restarts_the_socket_task() {
        let mut client = RealtimeClient::new(RealtimeOptions {
            url: "ws://127.0.0.1:1/ws".to_string(),
            token: None,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
        });
        client.connect();
        client.close();
        // Immediate restart: the old task may not have exited yet
        client.connect();
        assert!(client.outbound.is_some());
        assert!(!client.closed.load(Ordering::SeqCst));
        assert!(client.task.as_ref().is_some_and(|task| !task.is_finished()));
    }

    #[tokio::test]
    async fn test_send_fails_fast_when_not_open() {
        let client = RealtimeClient::new(RealtimeOptions {
            url: "ws://localhost:1/ws".to_string(),
            token: None,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(10),
        });
        // Never connected: send must refuse rather than queue
        assert!(!client.send(Envelope::new("subscribe")));
        assert!(!client.subscribe("daily"));
    }
}

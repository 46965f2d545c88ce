//! Connection management: transport setup, registration handshake and the
//! read/write loop.
//!
//! The connection runs in a spawned task. Consumers get an [`IrcHandle`] for
//! outbound commands and a receiver of [`IrcEvent`]s in arrival order.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use chadgpt_core::config::IrcConfig;

use crate::codec::IrcCodec;
use crate::error::IrcError;
use crate::event::IrcEvent;
use crate::message::Message;
use crate::sender::IrcSender;
use crate::split;

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Handle for queueing outbound commands on a running connection.
#[derive(Clone)]
pub struct IrcHandle {
    tx: mpsc::UnboundedSender<Message>,
    max_line_bytes: usize,
}

impl IrcHandle {
    /// Build a handle around an existing command queue (used by tests and custom transports).
    pub fn from_sender(tx: mpsc::UnboundedSender<Message>, max_line_bytes: usize) -> Self {
        Self { tx, max_line_bytes }
    }

    fn send(&self, msg: Message) {
        if self.tx.send(msg).is_err() {
            debug!("IRC connection closed; dropping outbound command");
        }
    }
}

impl IrcSender for IrcHandle {
    fn join(&self, channel: &str) {
        self.send(Message::join(channel));
    }

    /// CR/LF become spaces, then text over `max_line_bytes` goes out as
    /// several PRIVMSGs split at spaces. Only the first chunk keeps whatever
    /// prefix the caller put on the line, and the reply formatter's line cap
    /// counts lines before this split, so one formatted line may arrive as
    /// more than one message.
    fn say(&self, target: &str, text: &str) {
        let text = split::sanitize(text);
        if text.is_empty() {
            return;
        }
        for chunk in split::split_chunks(&text, self.max_line_bytes) {
            self.send(Message::privmsg(target, &chunk));
        }
    }

    fn change_nick(&self, nick: &str) {
        self.send(Message::nick(nick));
    }

    fn quit(&self, reason: Option<&str>) {
        self.send(Message::quit(reason));
    }
}

/// IRC client connector.
pub struct IrcClient;

impl IrcClient {
    /// Connect, send the registration handshake and start the connection task.
    ///
    /// Transport errors before the task starts are returned; later failures
    /// arrive as a final [`IrcEvent::Disconnected`].
    pub async fn connect(
        config: &IrcConfig,
    ) -> Result<(IrcHandle, mpsc::UnboundedReceiver<IrcEvent>), IrcError> {
        info!(host = %config.host, port = config.port, tls = config.tls, "connecting to IRC server");
        let transport = open_transport(config).await?;
        let mut framed = Framed::new(transport, IrcCodec::default());

        if let Some(password) = &config.password {
            framed.send(Message::pass(password)).await?;
        }
        framed.send(Message::nick(&config.nick)).await?;
        framed
            .send(Message::user(config.username(), &config.gecos))
            .await?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let reason = match run_connection(framed, cmd_rx, &event_tx).await {
                Ok(reason) => reason,
                Err(e) => e.to_string(),
            };
            warn!(reason = %reason, "IRC connection ended");
            let _ = event_tx.send(IrcEvent::Disconnected { reason });
        });

        Ok((
            IrcHandle::from_sender(cmd_tx, config.max_line_bytes),
            event_rx,
        ))
    }
}

async fn open_transport(config: &IrcConfig) -> Result<Box<dyn Transport>, IrcError> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
    tcp.set_nodelay(true)?;

    if !config.tls {
        return Ok(Box::new(tcp));
    }

    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
        .map_err(|e| IrcError::InvalidServerName(format!("{}: {e}", config.host)))?;
    let tls = TlsConnector::from(Arc::new(tls_config))
        .connect(server_name, tcp)
        .await?;
    Ok(Box::new(tls))
}

/// Pump commands out and events in until either side closes.
///
/// Returns the reason the connection ended.
async fn run_connection<T: Transport>(
    framed: Framed<T, IrcCodec>,
    mut cmd_rx: mpsc::UnboundedReceiver<Message>,
    event_tx: &mpsc::UnboundedSender<IrcEvent>,
) -> Result<String, IrcError> {
    let (mut sink, mut stream) = framed.split();

    loop {
        tokio::select! {
            outbound = cmd_rx.recv() => {
                let Some(msg) = outbound else {
                    return Ok("all handles dropped".to_string());
                };
                let quitting = msg.command == "QUIT";
                sink.send(msg).await?;
                if quitting {
                    return Ok("quit requested".to_string());
                }
            }
            inbound = stream.next() => {
                let Some(msg) = inbound.transpose()? else {
                    return Ok("server closed the connection".to_string());
                };
                match msg.command.as_str() {
                    "PING" => {
                        let token = msg.param(0).unwrap_or_default().to_string();
                        sink.send(Message::pong(&token)).await?;
                    }
                    "ERROR" => {
                        let reason = msg.param(0).unwrap_or("unknown").to_string();
                        return Err(IrcError::Closed(reason));
                    }
                    _ => {
                        debug!(line = %msg, "received");
                        if let Some(event) = IrcEvent::from_message(&msg) {
                            if event_tx.send(event).is_err() {
                                return Ok("event receiver dropped".to_string());
                            }
                        }
                    }
                }
            }
        }
    }
}

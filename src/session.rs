//! Per-connection session: the state shared between the two relay pipes
//! and the task that drives a proxied connection to completion.

use crate::{
    hypixel::{BedwarsMode, HypixelClient},
    mojang::MojangClient,
    pipe::{Direction, Pipe},
    protocol::framing::FrameWriter,
};
use anyhow::Context;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tokio::{
    net::{tcp::OwnedWriteHalf, TcpStream},
    sync::{Mutex as AsyncMutex, Notify},
    task,
};

/// Connection state of the proxied protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

/// Everything a session needs that outlives any one connection.
#[derive(Clone)]
pub struct SessionContext {
    pub forward_host: String,
    pub forward_port: u16,
    pub access_token: String,
    pub uuid: String,
    pub mojang: Arc<MojangClient>,
    pub hypixel: Option<Arc<HypixelClient>>,
}

/// Mutable state both pipes consult. Each field has a single writing pipe;
/// the mutex only makes the writes visible to the other side.
#[derive(Debug)]
struct SessionState {
    state: ConnectionState,
    threshold: i32,
    is_hypixel: bool,
    bedwars_mode: Option<BedwarsMode>,
}

/// One-shot exit signal shared by both pipes. The first pipe to observe a
/// peer disconnect records it; the second fires the signal and unblocks
/// the session task.
pub struct ExitSignal {
    should_exit: AtomicBool,
    exited: Notify,
}

impl ExitSignal {
    fn new() -> Self {
        Self {
            should_exit: AtomicBool::new(false),
            exited: Notify::new(),
        }
    }

    /// Reports a graceful peer disconnect (EOF or broken pipe).
    pub fn peer_disconnected(&self) {
        if self.should_exit.swap(true, Ordering::SeqCst) {
            self.exited.notify_one();
        }
    }

    /// Reports a session-fatal error; tears the session down immediately.
    pub fn abort(&self) {
        self.should_exit.store(true, Ordering::SeqCst);
        self.exited.notify_one();
    }

    pub async fn wait(&self) {
        self.exited.notified().await;
    }
}

/// State shared by the two pipes of one proxied connection.
pub struct Session {
    state: Mutex<SessionState>,
    pub exit: ExitSignal,
    pub context: SessionContext,
    /// Writes toward the local client. Shared because the chat interceptor
    /// injects replies from the client→server pipe.
    pub client_writer: AsyncMutex<FrameWriter<OwnedWriteHalf>>,
    /// Writes toward the upstream server. Shared because the encryption and
    /// respawn handlers inject packets from the server→client pipe. The
    /// cipher switch happens under this lock, so the opposite pipe can
    /// never write a frame that straddles it.
    pub server_writer: AsyncMutex<FrameWriter<OwnedWriteHalf>>,
}

impl Session {
    fn new(
        context: SessionContext,
        client_writer: OwnedWriteHalf,
        server_writer: OwnedWriteHalf,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                state: ConnectionState::Handshaking,
                threshold: -1,
                is_hypixel: false,
                bedwars_mode: None,
            }),
            exit: ExitSignal::new(),
            context,
            client_writer: AsyncMutex::new(FrameWriter::new(client_writer)),
            server_writer: AsyncMutex::new(FrameWriter::new(server_writer)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().state
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.lock().unwrap().state = state;
    }

    pub fn threshold(&self) -> i32 {
        self.state.lock().unwrap().threshold
    }

    pub fn set_threshold(&self, threshold: i32) {
        self.state.lock().unwrap().threshold = threshold;
    }

    pub fn is_hypixel(&self) -> bool {
        self.state.lock().unwrap().is_hypixel
    }

    pub fn set_hypixel(&self, is_hypixel: bool) {
        self.state.lock().unwrap().is_hypixel = is_hypixel;
    }

    pub fn bedwars_mode(&self) -> Option<BedwarsMode> {
        self.state.lock().unwrap().bedwars_mode
    }

    pub fn set_bedwars_mode(&self, mode: Option<BedwarsMode>) {
        self.state.lock().unwrap().bedwars_mode = mode;
    }
}

/// Drives one proxied connection to completion.
pub async fn run(client_stream: TcpStream, context: SessionContext) {
    if let Err(e) = run_inner(client_stream, context).await {
        tracing::warn!("session ended with error: {e:#}");
    }
}

async fn run_inner(client_stream: TcpStream, context: SessionContext) -> anyhow::Result<()> {
    let forward_addr = format!("{}:{}", context.forward_host, context.forward_port);
    let server_stream = TcpStream::connect(&forward_addr)
        .await
        .with_context(|| format!("failed to connect to {forward_addr}"))?;

    let (client_read, client_write) = client_stream.into_split();
    let (server_read, server_write) = server_stream.into_split();

    let session = Arc::new(Session::new(context, client_write, server_write));

    let client_to_server = task::spawn(
        Pipe::new(Arc::clone(&session), client_read, Direction::ClientToServer).run(),
    );
    let server_to_client = task::spawn(
        Pipe::new(Arc::clone(&session), server_read, Direction::ServerToClient).run(),
    );

    session.exit.wait().await;

    // Half-close the upstream write half before tearing down.
    session.server_writer.lock().await.shutdown().await.ok();
    client_to_server.abort();
    server_to_client.abort();

    tracing::info!("cleared proxy state and closed the server connection");
    Ok(())
}

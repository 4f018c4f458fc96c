//! Socket accept loop and pipe session driving the shared protocol.

use std::{
    io,
    net::{TcpListener, TcpStream},
    thread,
};

use anyhow::{Context, Result};
use sokobots_protocol::{
    serve_session, Dispatcher, LengthPrefixed, LineDelimited, SharedDispatcher, TransportError,
};
use tracing::{info, warn};

/// Accepts stream connections forever, one thread per connection.
pub(crate) fn serve(listen: &str, dispatcher: SharedDispatcher, max_frame_len: usize) -> Result<()> {
    let listener =
        TcpListener::bind(listen).with_context(|| format!("failed to bind {listen}"))?;
    let address = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(%address, max_frame_len, "listening for length-prefixed sessions");

    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(stream) => stream,
            Err(error) => {
                warn!(%error, "failed to accept connection");
                continue;
            }
        };
        let dispatcher = dispatcher.clone();
        let spawned = thread::Builder::new()
            .name("sokobots-session".into())
            .spawn(move || serve_connection(stream, &dispatcher, max_frame_len));
        if let Err(error) = spawned {
            warn!(%error, "failed to spawn session thread");
        }
    }

    Ok(())
}

fn serve_connection(stream: TcpStream, dispatcher: &SharedDispatcher, max_frame_len: usize) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_owned(), |address| address.to_string());
    if let Err(error) = stream.set_nodelay(true) {
        warn!(%peer, %error, "failed to disable Nagle's algorithm");
    }
    info!(%peer, "session opened");

    let mut transport = LengthPrefixed::with_max_frame_len(stream, max_frame_len);
    let result = serve_session(&mut transport, |payload| dispatcher.handle_payload(payload));
    log_session_end(&peer, result);
}

/// Serves newline-delimited requests from stdin until it closes.
pub(crate) fn run_pipe(mut dispatcher: Dispatcher, max_line_len: usize) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut transport = LineDelimited::with_max_line_len(stdin.lock(), stdout.lock(), max_line_len);
    info!(max_line_len, "serving newline-delimited session on stdin/stdout");

    let result = serve_session(&mut transport, |payload| dispatcher.handle_payload(payload));
    log_session_end("stdin", result);
}

fn log_session_end(peer: &str, result: Result<usize, TransportError>) {
    match result {
        Ok(served) => info!(peer, served, "session closed"),
        Err(error) => warn!(peer, %error, "session ended by transport error"),
    }
}

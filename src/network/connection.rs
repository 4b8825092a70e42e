//! Connection Handler
//!
//! Serves one client: read a request frame, run it against the engine,
//! write the response frame, repeat until the peer goes away.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BigcellError, Result};
use crate::engine::Engine;
use crate::protocol::{encode_reply, read_command, write_response, Command, Response};

/// Request/response loop for one client socket
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    engine: Arc<Engine>,
    peer_addr: String,
}

impl Connection {
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Requests are small and latency bound
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            engine,
            peer_addr,
        })
    }

    /// Apply socket timeouts; 0 leaves a direction without one
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve requests until the client disconnects (blocking)
    ///
    /// A peer that hangs up, resets or idles past the read timeout ends the
    /// loop with `Ok`. A malformed frame is answered with an error response
    /// and then the connection is dropped.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Client {} connected", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(BigcellError::Io(ref e)) if is_hangup(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(BigcellError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Closing idle client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Bad request frame from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::from_error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(
                "{} {:?} from {}",
                if command.is_write() { "write" } else { "read" },
                command.command_type(),
                self.peer_addr
            );

            let response = self.execute_command(command);
            match self.send_response(response) {
                Ok(()) => {}
                Err(BigcellError::Io(ref e))
                    if is_hangup(e.kind()) || e.kind() == ErrorKind::BrokenPipe =>
                {
                    tracing::debug!("Client {} left before its response was sent", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    fn execute_command(&self, command: Command) -> Response {
        let kind = command.command_type();
        let reply = self
            .engine
            .execute(command)
            .and_then(|reply| encode_reply(&reply));

        match reply {
            Ok(payload) => Response::ok(Some(payload)),
            Err(e) => {
                tracing::debug!("{:?} from {} failed: {}", kind, self.peer_addr, e);
                Response::from_error(&e)
            }
        }
    }

    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)?;
        Ok(())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_hangup(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

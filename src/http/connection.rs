use std::io::{ErrorKind, Read, Write};
use std::process::Child;
use std::sync::Arc;
use std::time::Instant;

use mio::net::TcpStream;
use mio::unix::pipe;

use crate::config::{ResolvedRoute, ServerConfig};
use crate::http::request::{HttpRequest, READ_BUF_SIZE};
use crate::http::response::HttpResponse;

/// A CGI invocation in flight: the non-owning back-reference from the pipe
/// descriptor to this connection lives in `Server::cgi_to_client`, not here
/// (see the design note on pipe/connection back-references).
pub struct CgiHandle {
    pub stdout: pipe::Receiver,
    pub child: Child,
    pub start: Instant,
}

/// Tagged connection state. Data valid only in one state -- the CGI pipe
/// and child handle -- is scoped to the variant that owns it, so it cannot
/// be read or mutated from any other state.
pub enum ConnectionState {
    ReadingRequest,
    Processing,
    WaitingForCgi(CgiHandle),
    WritingResponse,
    Done,
    Error,
}

pub struct Connection {
    pub stream: TcpStream,
    pub listen_port: u16,
    pub state: ConnectionState,
    pub request: HttpRequest,
    pub response: HttpResponse,
    pub response_buffer: Vec<u8>,
    pub config_resolved: bool,
    pub max_body_size: usize,
    pub s_cfg: Option<Arc<ServerConfig>>,
    pub route: Option<ResolvedRoute>,
    pub last_activity: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream, listen_port: u16) -> Self {
        Self {
            stream,
            listen_port,
            state: ConnectionState::ReadingRequest,
            request: HttpRequest::new(),
            response: HttpResponse::new(200, "OK"),
            response_buffer: Vec::new(),
            config_resolved: false,
            max_body_size: 0,
            s_cfg: None,
            route: None,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ConnectionState::Done | ConnectionState::Error)
    }

    pub fn wants_write(&self) -> bool {
        !self.response_buffer.is_empty() || matches!(self.state, ConnectionState::WritingResponse)
    }

    /// Reads up to `READ_BUF_SIZE` bytes at a time until the socket would
    /// block. Returns `Ok(true)` on EOF.
    pub fn read_into_request(&mut self) -> std::io::Result<bool> {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(true),
                Ok(n) => {
                    self.request.buffer.extend_from_slice(&buf[..n]);
                    self.touch();
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
    }

    /// Attempts to drain `response_buffer` into the socket. Returns
    /// `Err` on a hard transport failure (caller transitions to ERROR).
    pub fn flush_response(&mut self) -> std::io::Result<()> {
        match self.stream.write(&self.response_buffer) {
            Ok(n) => {
                self.response_buffer.drain(..n);
                self.touch();
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn queue_response(&mut self, response: &HttpResponse) {
        self.response_buffer.extend_from_slice(&response.to_bytes());
    }
}

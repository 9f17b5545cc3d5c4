use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::process::Child;
use std::sync::Arc;
use std::time::Duration;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use proxy_log::{errors, info, trace};

use crate::cgi;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::handlers::{self, Outcome};
use crate::http::request::BodyProgress;
use crate::http::{status_text, Connection, ConnectionState, HttpResponse};
use crate::router;
use crate::shutdown;
use crate::timeouts;

struct Listener {
    socket: TcpListener,
    port: u16,
}

/// Owns every listener, the connection table, and the pipe→connection
/// back-reference used to dispatch CGI read-readiness events. Only the
/// thread running `run` ever touches this state.
pub struct Server {
    poll: Poll,
    listeners: Vec<Listener>,
    configs: Vec<Arc<ServerConfig>>,
    connections: HashMap<Token, Connection>,
    cgi_to_client: HashMap<Token, Token>,
    zombies: Vec<Child>,
    next_token: usize,
}

impl Server {
    pub fn new(configs: Vec<ServerConfig>) -> Result<Self> {
        let poll = Poll::new()?;
        let configs: Vec<Arc<ServerConfig>> = configs.into_iter().map(Arc::new).collect();

        let mut ports: Vec<u16> = configs.iter().map(|c| c.listen).collect();
        ports.sort_unstable();
        ports.dedup();

        let mut listeners = Vec::new();
        for (idx, port) in ports.iter().enumerate() {
            let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
            let mut socket = TcpListener::bind(addr)?;
            poll.registry().register(&mut socket, Token(idx), Interest::READABLE)?;
            info!("listening on port {}", port);
            listeners.push(Listener { socket, port: *port });
        }

        let next_token = listeners.len();
        Ok(Self {
            poll,
            listeners,
            configs,
            connections: HashMap::new(),
            cgi_to_client: HashMap::new(),
            zombies: Vec::new(),
            next_token,
        })
    }

    fn alloc_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(256);
        loop {
            self.poll.poll(&mut events, Some(Duration::from_secs(1)))?;

            if shutdown::requested() {
                info!("shutdown requested, closing listeners and connections");
                self.shutdown();
                return Ok(());
            }

            let batch: Vec<(Token, bool, bool)> =
                events.iter().map(|e| (e.token(), e.is_readable(), e.is_writable())).collect();

            for (token, readable, writable) in batch {
                if token.0 < self.listeners.len() {
                    self.accept_on(token);
                    continue;
                }

                if let Some(client_token) = self.cgi_to_client.get(&token).copied() {
                    if readable {
                        self.handle_cgi_readable(token, client_token);
                    }
                    continue;
                }

                if readable {
                    self.handle_client_readable(token);
                }
                if writable {
                    self.handle_client_writable(token);
                }
            }

            self.advance_processing();
            timeouts::sweep(&mut self.connections, &mut self.zombies, &self.poll);
            self.reap_terminal_connections();
        }
    }

    fn accept_on(&mut self, listener_token: Token) {
        let port = self.listeners[listener_token.0].port;
        loop {
            let (mut stream, addr) = match self.listeners[listener_token.0].socket.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    errors!("accept failed on port {}: {}", port, e);
                    return;
                }
            };

            let token = self.alloc_token();
            if let Err(e) = self
                .poll
                .registry()
                .register(&mut stream, token, Interest::READABLE | Interest::WRITABLE)
            {
                errors!("failed to register client {}: {}", addr, e);
                continue;
            }
            trace!("accepted {} on port {} as {:?}", addr, port, token);
            self.connections.insert(token, Connection::new(stream, port));
        }
    }

    fn handle_client_readable(&mut self, token: Token) {
        let eof = {
            let Some(conn) = self.connections.get_mut(&token) else { return };
            if !matches!(conn.state, ConnectionState::ReadingRequest) {
                return;
            }
            match conn.read_into_request() {
                Ok(eof) => eof,
                Err(_) => {
                    conn.state = ConnectionState::Error;
                    return;
                }
            }
        };

        if eof {
            let still_empty = self.connections.get(&token).map(|c| c.request.buffer.is_empty()).unwrap_or(true);
            if still_empty {
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.state = ConnectionState::Done;
                }
                return;
            }
        }

        self.drive_request_parsing(token);
    }

    /// Parses as much of the request as the buffer currently allows,
    /// resolving the virtual host and route on first sight of a complete
    /// header block and freezing the body-size cap onto the connection.
    fn drive_request_parsing(&mut self, token: Token) {
        let configs = self.configs.clone();
        let Some(conn) = self.connections.get_mut(&token) else { return };

        if conn.request.try_parse_headers() && !conn.config_resolved {
            let host = conn.request.header("host").map(|h| h.to_string());
            let s_cfg = router::select_config(&configs, conn.listen_port, host.as_deref());
            let route = router::resolve_route(&s_cfg, conn.request.path());
            conn.max_body_size = route.max_body_size;
            conn.route = Some(route);
            conn.s_cfg = Some(s_cfg);
            conn.config_resolved = true;
        }

        if conn.config_resolved && conn.request.content_length > conn.max_body_size {
            reject_too_large(conn);
            return;
        }

        match conn.request.continue_body(conn.max_body_size) {
            BodyProgress::Complete => conn.state = ConnectionState::Processing,
            BodyProgress::NeedMoreData => {}
            BodyProgress::TooLarge => reject_too_large(conn),
        }
    }

    /// Runs `handlers::process_request` for every connection currently in
    /// PROCESSING: either queues its response, or launches the CGI child and
    /// registers its pipe for read-readiness.
    fn advance_processing(&mut self) {
        let tokens: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, c)| matches!(c.state, ConnectionState::Processing))
            .map(|(t, _)| *t)
            .collect();

        for token in tokens {
            let Some(conn) = self.connections.get(&token) else { continue };
            let (Some(route), Some(s_cfg)) = (conn.route.clone(), conn.s_cfg.clone()) else { continue };
            let fd = conn.stream.as_raw_fd();
            let peer = conn.stream.peer_addr().ok();

            let outcome = handlers::process_request(&conn.request, &route, &s_cfg, fd);

            match outcome {
                Outcome::Response(response) => {
                    if let Some(conn) = self.connections.get_mut(&token) {
                        conn.queue_response(&response);
                        conn.state = ConnectionState::WritingResponse;
                    }
                }
                Outcome::Cgi => self.launch_cgi_for(token, &route, peer),
            }
        }
    }

    fn launch_cgi_for(&mut self, token: Token, route: &crate::config::ResolvedRoute, peer: Option<SocketAddr>) {
        if !self.connections.contains_key(&token) {
            return;
        }

        let launched = {
            let conn = self.connections.get(&token).unwrap();
            cgi::launch_cgi(&conn.request, route, peer)
        };

        match launched {
            Ok(mut handle) => {
                let pipe_token = self.alloc_token();
                let registered = self
                    .poll
                    .registry()
                    .register(&mut handle.stdout, pipe_token, Interest::READABLE)
                    .is_ok();

                let Some(conn) = self.connections.get_mut(&token) else { return };
                if registered {
                    self.cgi_to_client.insert(pipe_token, token);
                    conn.state = ConnectionState::WaitingForCgi(handle);
                } else {
                    reject_internal_error(conn);
                }
            }
            Err(e) => {
                errors!("cgi launch failed: {}", e);
                let Some(conn) = self.connections.get_mut(&token) else { return };
                let fd = conn.stream.as_raw_fd();
                match conn.s_cfg.clone() {
                    Some(s_cfg) => {
                        let response = handlers::dispatch_static(&conn.request, route, &s_cfg, fd);
                        conn.queue_response(&response);
                        conn.state = ConnectionState::WritingResponse;
                    }
                    None => reject_internal_error(conn),
                }
            }
        }
    }

    fn handle_cgi_readable(&mut self, pipe_token: Token, client_token: Token) {
        let finished = {
            let Some(conn) = self.connections.get_mut(&client_token) else { return };
            let ConnectionState::WaitingForCgi(handle) = &mut conn.state else { return };

            let mut chunk = Vec::new();
            let done = cgi::read_cgi_chunk(handle, &mut chunk);
            conn.response_buffer.extend_from_slice(&chunk);
            conn.touch();
            done
        };

        if !finished {
            return;
        }

        self.cgi_to_client.remove(&pipe_token);

        let Some(conn) = self.connections.get_mut(&client_token) else { return };
        let ConnectionState::WaitingForCgi(mut handle) =
            std::mem::replace(&mut conn.state, ConnectionState::WritingResponse)
        else {
            return;
        };

        let _ = self.poll.registry().deregister(&mut handle.stdout);
        if cgi::try_reap(&mut handle.child).ok().flatten().is_none() {
            self.zombies.push(handle.child);
        }

        if let Some(conn) = self.connections.get_mut(&client_token) {
            let _ = self.poll.registry().reregister(
                &mut conn.stream,
                client_token,
                Interest::READABLE | Interest::WRITABLE,
            );
        }
    }

    fn handle_client_writable(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else { return };
        if !conn.wants_write() {
            return;
        }
        if conn.flush_response().is_err() {
            conn.state = ConnectionState::Error;
            return;
        }
        if conn.response_buffer.is_empty() && matches!(conn.state, ConnectionState::WritingResponse) {
            conn.state = ConnectionState::Done;
        }
    }

    /// Closes every listener and connection without notifying clients (the
    /// TCP close is the only signal they get) and detaches any in-flight
    /// CGI children to the zombie list instead of waiting on them.
    fn shutdown(&mut self) {
        for listener in &mut self.listeners {
            let _ = self.poll.registry().deregister(&mut listener.socket);
        }

        for (_, mut conn) in self.connections.drain() {
            if let ConnectionState::WaitingForCgi(mut handle) =
                std::mem::replace(&mut conn.state, ConnectionState::Done)
            {
                let _ = self.poll.registry().deregister(&mut handle.stdout);
                cgi::kill_and_detach(handle, &mut self.zombies);
            }
            let _ = self.poll.registry().deregister(&mut conn.stream);
            let _ = conn.stream.shutdown(Shutdown::Both);
        }
        self.cgi_to_client.clear();
    }

    fn reap_terminal_connections(&mut self) {
        let terminal: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, c)| c.is_terminal())
            .map(|(t, _)| *t)
            .collect();

        for token in terminal {
            if let Some(mut conn) = self.connections.remove(&token) {
                let _ = self.poll.registry().deregister(&mut conn.stream);
                let _ = conn.stream.shutdown(Shutdown::Both);
            }
            self.cgi_to_client.retain(|_, client| *client != token);
        }
    }
}

fn reject_too_large(conn: &mut Connection) {
    let mut response = HttpResponse::new(413, status_text(413));
    response.set_body(b"413 Payload Too Large".to_vec(), "text/plain");
    conn.queue_response(&response);
    conn.state = ConnectionState::WritingResponse;
}

fn reject_internal_error(conn: &mut Connection) {
    let mut response = HttpResponse::new(500, status_text(500));
    response.set_body(b"500 Internal Server Error".to_vec(), "text/plain");
    conn.queue_response(&response);
    conn.state = ConnectionState::WritingResponse;
}

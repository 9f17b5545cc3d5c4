use std::collections::HashMap;
use std::process::Child;
use std::time::{Duration, Instant};

use mio::{Interest, Poll, Token};

use crate::cgi;
use crate::http::response::status_text;
use crate::http::{Connection, ConnectionState, HttpResponse};

/// Idle connections are given this long between reads/writes before the
/// core synthesizes a 408 and starts draining it.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs after every event batch: reaps whatever children already exited
/// (best-effort, not tied to individual connections) and converts
/// long-idle connections to a 408 response.
pub fn sweep(connections: &mut HashMap<Token, Connection>, zombies: &mut Vec<Child>, poll: &Poll) {
    cgi::reap_zombies(zombies);

    let now = Instant::now();
    for (token, conn) in connections.iter_mut() {
        if matches!(
            conn.state,
            ConnectionState::Done | ConnectionState::Error | ConnectionState::WritingResponse
        ) {
            continue;
        }
        if now.duration_since(conn.last_activity) <= CLIENT_TIMEOUT {
            continue;
        }

        if let ConnectionState::WaitingForCgi(mut handle) =
            std::mem::replace(&mut conn.state, ConnectionState::WritingResponse)
        {
            let _ = poll.registry().deregister(&mut handle.stdout);
            cgi::kill_and_detach(handle, zombies);
        }

        let mut response = HttpResponse::new(408, status_text(408));
        response.set_body(b"408 Request Timeout".to_vec(), "text/plain");
        conn.queue_response(&response);

        let _ = poll
            .registry()
            .reregister(&mut conn.stream, *token, Interest::READABLE | Interest::WRITABLE);
    }
}

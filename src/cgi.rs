use std::collections::HashMap;
use std::io::{self, ErrorKind, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use crate::config::ResolvedRoute;
use crate::http::{CgiHandle, HttpRequest};

/// Builds the CGI/1.1 environment per the environment variables this core
/// guarantees; the script's own stdin is left empty (see the design note
/// on CGI request bodies not being piped to stdin).
pub fn build_cgi_env(
    request: &HttpRequest,
    route: &ResolvedRoute,
    peer: Option<SocketAddr>,
) -> HashMap<String, String> {
    let mut env = HashMap::new();
    let path = request.path();

    env.insert("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string());
    env.insert("SERVER_PROTOCOL".to_string(), "HTTP/1.1".to_string());
    env.insert("REQUEST_METHOD".to_string(), request.method.clone());
    env.insert("SCRIPT_FILENAME".to_string(), script_path(route, path).to_string_lossy().into_owned());
    env.insert("SCRIPT_NAME".to_string(), path.to_string());
    env.insert("QUERY_STRING".to_string(), request.query_string().to_string());
    env.insert("REDIRECT_STATUS".to_string(), "200".to_string());

    if let Some(ct) = request.header("content-type") {
        env.insert("CONTENT_TYPE".to_string(), ct.to_string());
    }
    if let Some(cl) = request.header("content-length") {
        env.insert("CONTENT_LENGTH".to_string(), cl.to_string());
    }
    if let Some(addr) = peer {
        env.insert("REMOTE_ADDR".to_string(), addr.ip().to_string());
        env.insert("REMOTE_PORT".to_string(), addr.port().to_string());
    }

    env
}

fn script_path(route: &ResolvedRoute, request_path: &str) -> PathBuf {
    PathBuf::from(&route.root).join(request_path.trim_start_matches('/'))
}

/// Forks a CGI child whose stdout is wired to a non-blocking pipe suitable
/// for `mio` registration. Fork/pipe failure is reported to the caller,
/// which falls back to the static-response pipeline for the same request
/// per the spec's error-handling table.
pub fn launch_cgi(
    request: &HttpRequest,
    route: &ResolvedRoute,
    peer: Option<SocketAddr>,
) -> io::Result<CgiHandle> {
    let path = script_path(route, request.path());
    let (receiver, sender) = mio::unix::pipe::new()?;

    let child = Command::new(&path)
        .env_clear()
        .envs(build_cgi_env(request, route, peer))
        .stdin(Stdio::null())
        .stdout(sender)
        .stderr(Stdio::null())
        .spawn()?;

    Ok(CgiHandle {
        stdout: receiver,
        child,
        start: Instant::now(),
    })
}

/// Reads whatever is currently available from the CGI pipe directly into
/// `out`, forwarding the script's stdout verbatim (no `Status:`/header
/// parsing in this core). Returns `true` on EOF or a hard read error.
pub fn read_cgi_chunk(handle: &mut CgiHandle, out: &mut Vec<u8>) -> bool {
    let mut buf = [0u8; 4096];
    loop {
        match handle.stdout.read(&mut buf) {
            Ok(0) => return true,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
            Err(_) => return true,
        }
    }
}

/// Non-blocking reap; `None` means the child is still running.
pub fn try_reap(child: &mut Child) -> io::Result<Option<std::process::ExitStatus>> {
    child.try_wait()
}

pub fn kill_and_detach(mut handle: CgiHandle, zombies: &mut Vec<Child>) {
    let _ = handle.child.kill();
    match handle.child.try_wait() {
        Ok(Some(_)) => {}
        _ => zombies.push(handle.child),
    }
}

/// Reaps any children that already exited, without blocking. Children
/// whose owning connection was torn down still show up here eventually.
pub fn reap_zombies(zombies: &mut Vec<Child>) {
    zombies.retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
}

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration as StdDuration;

use anyhow::{Result, bail};
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep};

/// Loopback address with a port that was free a moment ago. Nothing is
/// bound to it when this returns.
pub fn unused_local_addr() -> Result<SocketAddr> {
    let socket = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(socket.local_addr()?)
}

/// Origin base URL that refuses connections.
pub fn closed_origin() -> Result<String> {
    Ok(format!("http://{}", unused_local_addr()?))
}

/// Polls `addr` until the proxy accepts a connection or the deadline passes.
pub async fn wait_until_accepting(addr: SocketAddr, within: StdDuration) -> Result<()> {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if TcpStream::connect(addr).await.is_ok() {
            return Ok(());
        }
        sleep(StdDuration::from_millis(25)).await;
    }
    bail!("nothing accepted connections on {addr} within {within:?}")
}

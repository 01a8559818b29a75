// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// Open a socket, write the finished print stream, close.  There is no
// protocol, no job tracking and no feedback from the printer.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument};

use freeprint_core::error::{FreeprintError, Result};

/// Default raw TCP port (HP JetDirect).
pub const RAW_PORT: u16 = 9100;

/// Write `data` to `host:port` in one shot.
///
/// Connecting, writing and closing must all finish within `timeout`.  Once
/// started the transfer cannot be cancelled; it completes or times out.
#[instrument(skip(data), fields(len = data.len()))]
pub async fn send_raw(host: &str, port: u16, data: &[u8], timeout: Duration) -> Result<()> {
    let addr = format!("{host}:{port}");

    tokio::time::timeout(timeout, write_all(&addr, data))
        .await
        .map_err(|_| {
            FreeprintError::RawSend(format!("{addr} timed out after {}s", timeout.as_secs()))
        })??;

    info!(%addr, "print stream sent");
    Ok(())
}

async fn write_all(addr: &str, data: &[u8]) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| FreeprintError::RawSend(format!("connect {addr}: {e}")))?;
    stream
        .write_all(data)
        .await
        .map_err(|e| FreeprintError::RawSend(format!("write {addr}: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| FreeprintError::RawSend(format!("flush {addr}: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| FreeprintError::RawSend(format!("shutdown {addr}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn delivers_every_byte() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        send_raw("127.0.0.1", port, &payload, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(reader.await.unwrap(), payload);
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = send_raw("127.0.0.1", port, b"x", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FreeprintError::RawSend(_)));
    }
}

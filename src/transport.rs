// CLASSIFICATION: COMMUNITY
// Filename: transport.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Seam to the byte-stream transport.
//!
//! The engine never opens sockets. A [`Connection`] is handed in by the
//! platform layer and [`exchange`] drives one send-then-wait round trip on
//! it.

use log::{debug, warn};

use crate::clock::TickSource;

/// One open connection to a peer.
pub trait Connection {
    type Error: std::fmt::Display;

    /// Queue `bytes` for transmission.
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Non-blocking read. Fills `buf` and returns true when a packet arrived.
    fn poll_receive(&mut self, buf: &mut Vec<u8>) -> Result<bool, Self::Error>;

    /// Release the connection.
    fn close(&mut self);
}

/// Result of a round trip that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Response(Vec<u8>),
    TimedOut,
}

/// Send `packet` and poll for a reply until `timeout_millis` pass.
///
/// `close` runs exactly once on every path, including send and receive
/// errors.
pub fn exchange<C, T>(
    conn: &mut C,
    clock: &T,
    packet: &[u8],
    timeout_millis: u64,
) -> Result<Exchange, C::Error>
where
    C: Connection + ?Sized,
    T: TickSource + ?Sized,
{
    let result = send_and_poll(conn, clock, packet, timeout_millis);
    conn.close();
    match &result {
        Ok(Exchange::TimedOut) => warn!("no response within {timeout_millis} ms"),
        Err(err) => warn!("exchange failed: {err}"),
        Ok(Exchange::Response(reply)) => debug!("response: {}", hex::encode(reply)),
    }
    result
}

fn send_and_poll<C, T>(
    conn: &mut C,
    clock: &T,
    packet: &[u8],
    timeout_millis: u64,
) -> Result<Exchange, C::Error>
where
    C: Connection + ?Sized,
    T: TickSource + ?Sized,
{
    conn.send(packet)?;
    let started = clock.now_millis();
    let mut buf = Vec::new();
    loop {
        if conn.poll_receive(&mut buf)? {
            return Ok(Exchange::Response(buf));
        }
        if clock.now_millis().saturating_sub(started) >= timeout_millis {
            return Ok(Exchange::TimedOut);
        }
    }
}

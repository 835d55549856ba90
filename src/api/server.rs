use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::handlers::handle_request;
use super::http::{read_request, write_response, ReadError};
use crate::db::Database;

const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking HTTP server that handles one connection at a time. Each request
/// gets its own store connection, released before the next accept.
pub struct Server {
    listener: TcpListener,
    database: Database,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, database: Database) -> Result<Self> {
        let listener = TcpListener::bind(addr).context("failed to bind HTTP listener")?;
        Ok(Self { listener, database })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    /// Accept and serve connections until the process is stopped. A broken
    /// connection is logged and skipped; it never takes the server down.
    pub fn run(&self) -> Result<()> {
        info!(addr = %self.local_addr()?, db = %self.database.path().display(), "serving workout API");
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(err) = self.serve_connection(stream) {
                        warn!(error = %format!("{err:#}"), "connection failed");
                    }
                }
                Err(err) => warn!(error = %err, "accept failed"),
            }
        }
        Ok(())
    }

    /// Serve exactly one connection.
    pub fn handle_next(&self) -> Result<()> {
        let (stream, _) = self
            .listener
            .accept()
            .context("failed to accept connection")?;
        self.serve_connection(stream)
    }

    fn serve_connection(&self, mut stream: TcpStream) -> Result<()> {
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .context("failed to set read timeout")?;
        stream
            .set_write_timeout(Some(IO_TIMEOUT))
            .context("failed to set write timeout")?;

        let request = match read_request(&mut stream) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(ReadError::BodyTooLarge(len)) => {
                warn!(len, "refused oversized request body");
                let response = ApiError::PayloadTooLarge.into_response();
                return write_response(&mut stream, &response).context("failed to write response");
            }
            Err(ReadError::Io(err)) => return Err(err).context("failed to read request"),
        };

        let started = Instant::now();
        let response = handle_request(&self.database, &request);
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled request"
        );

        write_response(&mut stream, &response).context("failed to write response")
    }
}

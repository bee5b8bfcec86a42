//! TCP transport to a running Simulation Host.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use physgen_types::{PhysgenError, PhysgenResult};

use crate::commands::Command;
use crate::framing;
use crate::host::SimulationHost;
use crate::records::ResponseBatch;

/// A blocking connection to the host.
pub struct TcpHost {
    address: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpHost {
    /// Connects to `address` (e.g. `localhost:1071`).
    pub fn connect(address: &str) -> PhysgenResult<Self> {
        let addrs: Vec<_> = address
            .to_socket_addrs()
            .map_err(|e| PhysgenError::Host(format!("cannot resolve '{address}': {e}")))?
            .collect();
        let stream = TcpStream::connect(addrs.as_slice())
            .map_err(|e| PhysgenError::Host(format!("cannot connect to '{address}': {e}")))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        tracing::info!(address, "connected to simulation host");
        Ok(Self {
            address: address.to_string(),
            reader,
            writer,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl SimulationHost for TcpHost {
    fn communicate(&mut self, commands: &[Command]) -> PhysgenResult<ResponseBatch> {
        framing::write_request(&mut self.writer, commands)?;
        let raw = framing::read_response(&mut self.reader)?;
        ResponseBatch::decode(&raw)
    }

    fn name(&self) -> &str {
        &self.address
    }
}

//! Length-prefixed framing for requests and responses.
//!
//! Request:  `u32 LE length` + JSON command array.
//! Response: `u32 LE record count`, then per record `u32 LE length` + payload.
//!
//! All functions are generic over `Read`/`Write` so that the same code runs
//! over a socket and over in-memory buffers.

use std::io::{Read, Write};

use physgen_types::{PhysgenError, PhysgenResult};

use crate::commands::Command;

/// Upper bound on a single frame or record. Larger lengths mean a corrupt stream.
pub const MAX_RECORD_LEN: usize = 256 * 1024 * 1024;

/// Upper bound on the number of records in one response.
pub const MAX_RECORDS: usize = 65_536;

fn read_u32<R: Read>(reader: &mut R) -> PhysgenResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_len<R: Read>(reader: &mut R, limit: usize, what: &str) -> PhysgenResult<usize> {
    let len = read_u32(reader)? as usize;
    if len > limit {
        return Err(PhysgenError::Protocol(format!(
            "{what} of {len} exceeds limit {limit}"
        )));
    }
    Ok(len)
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> PhysgenResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| PhysgenError::Protocol(format!("length {len} does not fit in u32")))?;
    writer.write_all(&len.to_le_bytes())?;
    Ok(())
}

/// Writes one request frame and flushes.
pub fn write_request<W: Write>(writer: &mut W, commands: &[Command]) -> PhysgenResult<()> {
    let payload =
        Command::encode_list(commands).map_err(|e| PhysgenError::Serialization(e.to_string()))?;
    write_len(writer, payload.len())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one request frame.
pub fn read_request<R: Read>(reader: &mut R) -> PhysgenResult<Vec<Command>> {
    let len = read_len(reader, MAX_RECORD_LEN, "request")?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).map_err(|e| PhysgenError::Protocol(e.to_string()))
}

/// Writes one response frame (raw records, trailer included) and flushes.
pub fn write_response<W: Write>(writer: &mut W, records: &[Vec<u8>]) -> PhysgenResult<()> {
    write_len(writer, records.len())?;
    for record in records {
        write_len(writer, record.len())?;
        writer.write_all(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads one response frame as raw records.
pub fn read_response<R: Read>(reader: &mut R) -> PhysgenResult<Vec<Vec<u8>>> {
    let count = read_len(reader, MAX_RECORDS, "record count")?;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_len(reader, MAX_RECORD_LEN, "record")?;
        let mut record = vec![0u8; len];
        reader.read_exact(&mut record)?;
        records.push(record);
    }
    Ok(records)
}

//! # physgen-protocol
//!
//! The request/response boundary to the Simulation Host.
//!
//! Commands go out as a typed, `"$type"`-tagged list; responses come back
//! as binary records that are decoded exactly once, here, into a closed
//! set of record kinds. Everything downstream matches on
//! [`ResponseRecord`] instead of inspecting tags.

pub mod commands;
pub mod framing;
pub mod host;
pub mod records;
pub mod scripted;
pub mod tcp;

pub use commands::{Command, FlexContainer, Frequency};
pub use host::SimulationHost;
pub use records::{RecordKind, ResponseBatch, ResponseRecord};
pub use scripted::ScriptedHost;
pub use tcp::TcpHost;

//! The Simulation Host abstraction.

use physgen_types::PhysgenResult;

use crate::commands::Command;
use crate::records::ResponseBatch;

/// A synchronous request/response peer that advances the simulation.
///
/// Each call sends one command list and blocks until the matching response
/// batch arrives. Implementations must not pipeline.
pub trait SimulationHost {
    /// Sends `commands` and returns the decoded response.
    fn communicate(&mut self, commands: &[Command]) -> PhysgenResult<ResponseBatch>;

    /// A short name for logs.
    fn name(&self) -> &str {
        "host"
    }
}

impl<H: SimulationHost + ?Sized> SimulationHost for Box<H> {
    fn communicate(&mut self, commands: &[Command]) -> PhysgenResult<ResponseBatch> {
        (**self).communicate(commands)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<H: SimulationHost + ?Sized> SimulationHost for &mut H {
    fn communicate(&mut self, commands: &[Command]) -> PhysgenResult<ResponseBatch> {
        (**self).communicate(commands)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! Controller host: one session per connection

use std::io::{Read, Write};
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::packing::PackedCiphertext;
use crate::shutdown::StopFlag;
use crate::telemetry::StageTimings;
use crate::wire::{read_expected, server_handshake, write_frame, FrameKind, SessionDescriptor};

use super::controller::EncryptedController;

#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub cycles: u64,
    pub timings: StageTimings,
}

/// Drives an [`EncryptedController`] over one request/response stream.
///
/// Per cycle: receive y → compute u → send and flush u → update x. The
/// update only runs after the output is on the wire, so the plant's round
/// trip does not include it.
pub struct ControllerSession {
    controller: EncryptedController,
    descriptor: Option<SessionDescriptor>,
    report_interval: u64,
    stop: StopFlag,
}

impl ControllerSession {
    pub fn new(controller: EncryptedController) -> Self {
        Self {
            controller,
            descriptor: None,
            report_interval: 100,
            stop: StopFlag::new(),
        }
    }

    /// Require a matching `Hello` before the first cycle
    pub fn with_handshake(mut self, descriptor: SessionDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_report_interval(mut self, cycles: u64) -> Self {
        self.report_interval = cycles.max(1);
        self
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Serve until the peer closes cleanly, a stop is requested, or an
    /// error occurs. Errors are fatal to the session.
    pub fn serve<S: Read + Write>(&mut self, stream: &mut S) -> Result<SessionReport> {
        if let Some(descriptor) = &self.descriptor {
            server_handshake(stream, descriptor)?;
        }

        self.controller.start()?;
        let result = self.run_cycles(stream);
        self.controller.finish();

        let report = result?;
        report.timings.report(report.cycles);
        info!(cycles = report.cycles, "controller session finished");
        Ok(report)
    }

    fn run_cycles<S: Read + Write>(&mut self, stream: &mut S) -> Result<SessionReport> {
        let mut report = SessionReport::default();

        while !self.stop.should_stop() {
            let cycle_start = Instant::now();
            let y: PackedCiphertext = match read_expected(stream, FrameKind::Measurement)? {
                Some(y) => y,
                None => {
                    info!("peer closed the connection");
                    break;
                }
            };
            let received = Instant::now();
            report.timings.recv.record(received - cycle_start);

            let (u, pending) = self.controller.compute_output(&y)?;
            let computed = Instant::now();
            report.timings.unpack_compute.record(computed - received);

            write_frame(stream, FrameKind::ControlOutput, &u)?;
            let sent = Instant::now();
            report.timings.send.record(sent - computed);

            self.controller.commit(pending)?;
            let updated = Instant::now();
            report.timings.update.record(updated - sent);
            report.timings.total.record(updated - received);

            report.cycles += 1;
            debug!(cycle = report.cycles, "cycle complete");
            if report.cycles % self.report_interval == 0 {
                report.timings.report(report.cycles);
            }
        }
        Ok(report)
    }
}

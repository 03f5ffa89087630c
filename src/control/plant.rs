//! Plant side: key holder and the sensor → actuator loop

use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::device::{Actuator, Sensor};
use crate::error::{ControlError, Result};
use crate::math::{GaussianSampler, NttContext};
use crate::packing::{decrypt_slots, encrypt_packed, PackedCiphertext, PackingLayout};
use crate::params::{Dimensions, ScalingParams, SchemeParams};
use crate::quantize::quantize_measurement;
use crate::rlwe::RlweSecretKey;
use crate::shutdown::StopFlag;
use crate::telemetry::{CsvLog, CycleRecord, LatencyStats};
use crate::wire::{client_handshake, read_expected, write_frame, FrameKind, PauseFlag, SessionDescriptor};

use super::model::ReferenceController;
use super::safety::SafetyGovernor;

const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Owns the secret key; encrypts measurements and decrypts outputs.
pub struct Plant {
    scaling: ScalingParams,
    dims: Dimensions,
    layout: PackingLayout,
    ctx: NttContext,
    sk: RlweSecretKey,
    sampler: GaussianSampler,
}

impl Plant {
    pub fn new(
        params: &SchemeParams,
        scaling: ScalingParams,
        dims: Dimensions,
        sk: RlweSecretKey,
        sampler: GaussianSampler,
    ) -> Result<Self> {
        params.validate()?;
        scaling.validate()?;
        dims.validate()?;
        if sk.ring_dim() != params.ring_dim || sk.modulus() != params.q {
            return Err(ControlError::InvalidParams(format!(
                "secret key is for ring {} mod {}, expected ring {} mod {}",
                sk.ring_dim(),
                sk.modulus(),
                params.ring_dim,
                params.q
            )));
        }
        Ok(Self {
            scaling,
            dims,
            layout: PackingLayout::for_dimensions(params.ring_dim, &dims)?,
            ctx: params.ntt_context(),
            sk,
            sampler,
        })
    }

    /// Quantize by r and pack at s⁰
    pub fn encrypt_measurement(&mut self, y: &[f64]) -> Result<PackedCiphertext> {
        if y.len() != self.dims.p {
            return Err(ControlError::Dimension(format!(
                "measurement has {} entries, expected {}",
                y.len(),
                self.dims.p
            )));
        }
        let y_bar = quantize_measurement(y, &self.scaling);
        encrypt_packed(
            &self.sk,
            &y_bar,
            &self.layout,
            self.scaling.packing_factor(),
            0,
            &mut self.sampler,
            &self.ctx,
        )
    }

    /// Decrypt an output at s² and rescale by r·s²·L
    pub fn decrypt_output(&self, u: &PackedCiphertext) -> Result<Vec<f64>> {
        self.decrypt_scaled(u, 2, self.dims.m)
    }

    /// Decrypt a state ciphertext at s¹; diagnostics only
    pub fn decrypt_state(&self, x: &PackedCiphertext) -> Result<Vec<f64>> {
        self.decrypt_scaled(x, 1, self.dims.n)
    }

    fn decrypt_scaled(&self, ct: &PackedCiphertext, s_power: u32, slots: usize) -> Result<Vec<f64>> {
        if ct.s_power != s_power {
            return Err(ControlError::ScaleMismatch {
                left: ct.s_power,
                right: s_power,
            });
        }
        if ct.slots != slots {
            return Err(ControlError::Dimension(format!(
                "ciphertext holds {} slots, expected {}",
                ct.slots, slots
            )));
        }
        let factor = self.scaling.rescale(s_power);
        Ok(decrypt_slots(&self.sk, ct, &self.layout, &self.ctx)?
            .into_iter()
            .map(|v| v as f64 * factor)
            .collect())
    }
}

/// Knobs of [`PlantLoop`]
#[derive(Debug, Clone, Default)]
pub struct PlantLoopOptions {
    /// Sleep to this cycle period; overruns are logged
    pub period: Option<Duration>,
    pub max_cycles: Option<u64>,
    /// Run the parameter handshake before the first cycle
    pub descriptor: Option<SessionDescriptor>,
    pub report_interval: u64,
}

/// End-of-run statistics
#[derive(Debug, Clone, Default)]
pub struct LoopSummary {
    pub cycles: u64,
    pub clamped: u64,
    pub missed_windows: u64,
    pub rtt: LatencyStats,
    pub max_u_diff: Option<f64>,
}

impl LoopSummary {
    pub fn log(&self) {
        info!(
            cycles = self.cycles,
            clamped = self.clamped,
            missed_windows = self.missed_windows,
            mean_rtt = ?self.rtt.mean(),
            max_rtt = ?self.rtt.max(),
            max_u_diff = ?self.max_u_diff,
            "plant loop finished"
        );
    }
}

/// Per-cycle orchestration on the plant host.
///
/// read y → encrypt → send → receive u → decrypt → govern → actuate →
/// reference shadow → CSV. Exactly one exchange is in flight at a time;
/// stop and pause requests are only looked at between cycles.
pub struct PlantLoop {
    plant: Plant,
    governor: SafetyGovernor,
    reference: Option<ReferenceController>,
    options: PlantLoopOptions,
    pause: Option<PauseFlag>,
    stop: StopFlag,
    csv: Option<CsvLog<Box<dyn Write + Send>>>,
}

impl PlantLoop {
    pub fn new(plant: Plant, governor: SafetyGovernor, options: PlantLoopOptions) -> Self {
        Self {
            plant,
            governor,
            reference: None,
            options,
            pause: None,
            stop: StopFlag::new(),
            csv: None,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceController) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_pause(mut self, pause: PauseFlag) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_csv(mut self, csv: CsvLog<Box<dyn Write + Send>>) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn run<S, Se, A>(&mut self, stream: &mut S, sensor: &mut Se, actuator: &mut A) -> Result<LoopSummary>
    where
        S: Read + Write,
        Se: Sensor,
        A: Actuator,
    {
        if let Some(descriptor) = &self.options.descriptor {
            client_handshake(stream, descriptor)?;
        }

        let started = Instant::now();
        let mut summary = LoopSummary::default();
        let mut last_cycle: Option<Instant> = None;
        let mut was_paused = false;
        let report_interval = self.options.report_interval.max(1);

        loop {
            if self.stop.should_stop() {
                info!("stop requested");
                break;
            }
            if self.options.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            if let Some(flag) = &self.pause {
                let paused = flag.is_paused();
                if paused != was_paused {
                    info!(paused, "pause state changed");
                    actuator.reset()?;
                    self.governor.reset();
                    was_paused = paused;
                    last_cycle = None;
                }
                if paused {
                    thread::sleep(PAUSE_POLL);
                    continue;
                }
            }

            let y = match sensor.read_measurement()? {
                Some(y) => y,
                None => {
                    info!("sensor stream ended");
                    break;
                }
            };
            let cycle_start = Instant::now();
            let loop_interval = last_cycle.map(|t| cycle_start - t).unwrap_or_default();
            last_cycle = Some(cycle_start);

            let y_ct = self.plant.encrypt_measurement(&y)?;
            let rtt_start = Instant::now();
            write_frame(stream, FrameKind::Measurement, &y_ct)?;
            let u_ct: PackedCiphertext = read_expected(stream, FrameKind::ControlOutput)?
                .ok_or_else(|| ControlError::Protocol("controller closed the connection mid-cycle".into()))?;
            let rtt = rtt_start.elapsed();

            let u = self.plant.decrypt_output(&u_ct)?;
            let governed = self.governor.govern(&y, &u);
            actuator.actuate(&governed.output)?;

            let u_local = match self.reference.as_mut() {
                Some(reference) => Some(reference.step(&y)?),
                None => None,
            };

            let record = CycleRecord {
                iter: summary.cycles,
                t_ms: millis(started.elapsed()),
                y,
                u_local: u_local.as_ref().and_then(|u| u.first().copied()),
                u_remote: u.first().copied().unwrap_or(0.0),
                u_out: governed.output.first().copied().unwrap_or(0.0),
                loop_interval_ms: millis(loop_interval),
                rtt_ms: millis(rtt),
                clamped: governed.clamped,
            };
            debug!(iter = record.iter, u = record.u_remote, clamped = record.clamped, "cycle");

            summary.cycles += 1;
            summary.rtt.record(rtt);
            if governed.clamped {
                summary.clamped += 1;
            }
            if let Some(diff) = record.u_diff() {
                summary.max_u_diff = Some(summary.max_u_diff.map_or(diff, |m| m.max(diff)));
            }
            if let Some(csv) = self.csv.as_mut() {
                csv.write(&record)?;
            }
            if summary.cycles % report_interval == 0 {
                info!(
                    cycles = summary.cycles,
                    mean_rtt = ?summary.rtt.mean(),
                    clamped = summary.clamped,
                    "plant progress"
                );
            }

            if let Some(period) = self.options.period {
                let elapsed = cycle_start.elapsed();
                if elapsed < period {
                    thread::sleep(period - elapsed);
                } else {
                    summary.missed_windows += 1;
                    warn!(elapsed = ?elapsed, period = ?period, "missed actuation window");
                }
            }
        }

        if let Some(csv) = self.csv.as_mut() {
            csv.flush()?;
        }
        summary.log();
        Ok(summary)
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

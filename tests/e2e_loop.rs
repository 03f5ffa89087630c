//! End-to-end control loop tests
//!
//! Setup → encrypt y → controller cycle → decrypt u, compared against the
//! plaintext reference, both in process and over a loopback TCP session.

use std::io::Cursor;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use encctl::control::{
    ControllerMatrices, ControllerSession, PidGains, PlantLoop, PlantLoopOptions,
    ReferenceController, SafetyGovernor, SafetyLimits,
};
use encctl::device::{Actuator, LineSensor, Sensor};
use encctl::error::{ControlError, Result};
use encctl::params::{ScalingParams, SchemeParams};
use encctl::session::{SessionArtifacts, SessionBuilder};
use encctl::wire::PauseFlag;

fn test_params() -> SchemeParams {
    SchemeParams::insecure_d256()
}

fn test_scaling() -> ScalingParams {
    ScalingParams::new(1e-3, 0.1, 1e-10).unwrap()
}

fn test_gains() -> PidGains {
    PidGains {
        kp: 1.0,
        ki: 0.1,
        kd: 0.5,
        lp: 0.2,
        li: 0.1,
        ld: 0.3,
    }
}

fn make_session(seed: u64) -> SessionArtifacts {
    SessionBuilder::new(
        test_params(),
        test_scaling(),
        ControllerMatrices::pid(&test_gains()),
    )
    .with_seed(seed)
    .build()
    .unwrap()
}

/// Replays a fixed list of measurements, then reports end of stream.
struct ScriptedSensor {
    samples: std::vec::IntoIter<Vec<f64>>,
}

impl ScriptedSensor {
    fn new(samples: Vec<Vec<f64>>) -> Self {
        Self {
            samples: samples.into_iter(),
        }
    }
}

impl Sensor for ScriptedSensor {
    fn read_measurement(&mut self) -> Result<Option<Vec<f64>>> {
        Ok(self.samples.next())
    }
}

#[derive(Default)]
struct RecordingActuator {
    commands: Vec<Vec<f64>>,
    resets: usize,
}

impl Actuator for RecordingActuator {
    fn actuate(&mut self, u: &[f64]) -> Result<()> {
        self.commands.push(u.to_vec());
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }
}

/// Serve one connection with the session's controller on a loopback port.
fn spawn_controller(
    session: &SessionArtifacts,
    handshake: bool,
) -> (String, thread::JoinHandle<Result<u64>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let controller = session.controller().unwrap();
    let descriptor = session.descriptor();

    let handle = thread::spawn(move || -> Result<u64> {
        let (mut stream, _) = listener.accept()?;
        let mut serve = ControllerSession::new(controller);
        if handshake {
            serve = serve.with_handshake(descriptor);
        }
        Ok(serve.serve(&mut stream)?.cycles)
    });
    (addr, handle)
}

#[test]
fn test_e2e_step_response_1000_cycles() {
    let session = make_session(201);
    let mut plant = session.plant().unwrap();
    let mut controller = session.controller().unwrap();
    let mut reference = session.reference_controller().unwrap();
    controller.start().unwrap();

    let y = [1.0, 0.0];
    let mut max_diff = 0.0f64;
    for cycle in 0..1000 {
        let u_ct = controller.step(&plant.encrypt_measurement(&y).unwrap()).unwrap();
        let u = plant.decrypt_output(&u_ct).unwrap();
        let expected = reference.step(&y).unwrap();
        let diff = (u[0] - expected[0]).abs();
        assert!(diff < 1e-2, "cycle {}: {} vs {}", cycle, u[0], expected[0]);
        max_diff = max_diff.max(diff);
    }
    // The angle integrator has accumulated the full step.
    assert!((reference.state()[0] - 1000.0).abs() < 1e-9);
    assert!(max_diff < 1e-2);
}

#[test]
fn test_e2e_scale_conservation() {
    let session = make_session(202);
    let mut plant = session.plant().unwrap();
    let mut controller = session.controller().unwrap();
    let mut reference = session.reference_controller().unwrap();
    controller.start().unwrap();

    let inputs = [[0.25, -1.0], [-0.5, 0.75], [1.125, 0.0], [0.0, -0.375]];
    for y in inputs {
        let y_ct = plant.encrypt_measurement(&y).unwrap();
        assert_eq!(y_ct.s_power, 0);
        let u_ct = controller.step(&y_ct).unwrap();
        assert_eq!(u_ct.s_power, 2);
        assert_eq!(u_ct.slots, 1);
        reference.step(&y).unwrap();

        let x_ct = controller.state();
        assert_eq!(x_ct.s_power, 1);
        assert_eq!(x_ct.slots, 4);
        let x = plant.decrypt_state(x_ct).unwrap();
        for (got, want) in x.iter().zip(reference.state()) {
            assert!((got - want).abs() < 1e-3, "{:?} vs {:?}", x, reference.state());
        }
    }
}

#[test]
fn test_e2e_tcp_loop_with_handshake() {
    let session = make_session(203);
    let (addr, handle) = spawn_controller(&session, true);

    let inputs: Vec<Vec<f64>> = (0..20)
        .map(|i| vec![((i % 7) as f64 - 3.0) * 0.125, ((i % 5) as f64 - 2.0) * 0.25])
        .collect();
    let mut reference = ReferenceController::new(session.reference.clone()).unwrap();
    let expected: Vec<f64> = inputs.iter().map(|y| reference.step(y).unwrap()[0]).collect();

    let options = PlantLoopOptions {
        descriptor: Some(session.descriptor()),
        report_interval: 5,
        ..Default::default()
    };
    let governor = SafetyGovernor::new(SafetyLimits::default(), 0);
    let mut plant_loop = PlantLoop::new(session.plant().unwrap(), governor, options)
        .with_reference(session.reference_controller().unwrap());

    let mut sensor = ScriptedSensor::new(inputs);
    let mut actuator = RecordingActuator::default();
    let summary = {
        let mut stream = TcpStream::connect(&addr).unwrap();
        plant_loop.run(&mut stream, &mut sensor, &mut actuator).unwrap()
    };

    assert_eq!(summary.cycles, 20);
    assert_eq!(summary.clamped, 0);
    assert_eq!(summary.rtt.count(), 20);
    assert!(summary.max_u_diff.unwrap() < 1e-3);
    assert_eq!(actuator.commands.len(), 20);
    for (got, want) in actuator.commands.iter().zip(&expected) {
        assert!((got[0] - want).abs() < 1e-3, "{} vs {}", got[0], want);
    }

    assert_eq!(handle.join().unwrap().unwrap(), 20);
}

#[test]
fn test_e2e_handshake_mismatch() {
    let session = make_session(204);
    let other = make_session(205);
    let (addr, handle) = spawn_controller(&session, true);

    let options = PlantLoopOptions {
        descriptor: Some(other.descriptor()),
        ..Default::default()
    };
    let governor = SafetyGovernor::new(SafetyLimits::default(), 0);
    let mut plant_loop = PlantLoop::new(other.plant().unwrap(), governor, options);

    let mut stream = TcpStream::connect(&addr).unwrap();
    let mut sensor = ScriptedSensor::new(vec![vec![0.0, 0.0]]);
    let mut actuator = RecordingActuator::default();
    let result = plant_loop.run(&mut stream, &mut sensor, &mut actuator);

    assert!(matches!(result, Err(ControlError::ParameterMismatch(_))));
    assert!(actuator.commands.is_empty());
    assert!(matches!(
        handle.join().unwrap(),
        Err(ControlError::ParameterMismatch(_))
    ));
}

#[test]
fn test_e2e_line_sensor_and_clamping() {
    let session = make_session(206);
    let (addr, handle) = spawn_controller(&session, false);

    // Two malformed lines, one out-of-bounds angle, one out-of-bounds position.
    let input = "0.5,0.0\n\nnot,a number\n45.0,0.0\n0.25,60.0\n-0.5,1.0\n";
    let mut sensor = LineSensor::new(Cursor::new(input), 2);
    let mut actuator = RecordingActuator::default();

    let governor = SafetyGovernor::new(SafetyLimits::default(), 0);
    let mut plant_loop =
        PlantLoop::new(session.plant().unwrap(), governor, PlantLoopOptions::default());
    let summary = {
        let mut stream = TcpStream::connect(&addr).unwrap();
        plant_loop.run(&mut stream, &mut sensor, &mut actuator).unwrap()
    };

    assert_eq!(sensor.skipped(), 2);
    assert_eq!(summary.cycles, 4);
    assert_eq!(summary.clamped, 2);
    assert_eq!(actuator.commands[1], vec![0.0]);
    assert_eq!(actuator.commands[2], vec![0.0]);
    assert_ne!(actuator.commands[0], vec![0.0]);
    assert_ne!(actuator.commands[3], vec![0.0]);
    assert_eq!(handle.join().unwrap().unwrap(), 4);
}

#[test]
fn test_e2e_pause_and_resume() {
    let session = make_session(207);
    let (addr, handle) = spawn_controller(&session, false);

    let pause = PauseFlag::new();
    pause.set(true);
    let resumer = {
        let pause = pause.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            pause.set(false);
        })
    };

    let governor = SafetyGovernor::new(SafetyLimits::default(), 0);
    let mut plant_loop =
        PlantLoop::new(session.plant().unwrap(), governor, PlantLoopOptions::default())
            .with_pause(pause);
    let mut sensor = ScriptedSensor::new(vec![vec![0.1, 0.0], vec![0.2, 0.0], vec![0.3, 0.0]]);
    let mut actuator = RecordingActuator::default();
    let summary = {
        let mut stream = TcpStream::connect(&addr).unwrap();
        plant_loop.run(&mut stream, &mut sensor, &mut actuator).unwrap()
    };
    resumer.join().unwrap();

    // One reset entering the pause, one leaving it.
    assert_eq!(actuator.resets, 2);
    assert_eq!(summary.cycles, 3);
    assert_eq!(actuator.commands.len(), 3);
    assert_eq!(handle.join().unwrap().unwrap(), 3);
}

#[test]
#[ignore = "production ring dimension; slow in debug builds"]
fn test_e2e_secure_params_tracks_reference() {
    let session = SessionBuilder::new(
        SchemeParams::secure_128_d2048(),
        test_scaling(),
        ControllerMatrices::pid(&test_gains()),
    )
    .with_seed(208)
    .build()
    .unwrap();
    let mut plant = session.plant().unwrap();
    let mut controller = session.controller().unwrap();
    let mut reference = session.reference_controller().unwrap();
    controller.start().unwrap();

    for i in 0..50 {
        let y = [((i % 9) as f64 - 4.0) * 0.0625, 0.5];
        let y_ct = plant.encrypt_measurement(&y).unwrap();
        let u_ct = controller.step(&y_ct).unwrap();
        let u = plant.decrypt_output(&u_ct).unwrap();
        let expected = reference.step(&y).unwrap();
        assert!((u[0] - expected[0]).abs() < 1e-2);
    }
}

#[test]
#[ignore = "production ring dimension; slow in debug builds"]
fn test_e2e_default_session_1000_cycles() {
    let session = SessionBuilder::new(
        SchemeParams::default(),
        ScalingParams::default(),
        ControllerMatrices::pid(&PidGains::default()),
    )
    .with_seed(7)
    .build()
    .unwrap();
    let mut plant = session.plant().unwrap();
    let mut controller = session.controller().unwrap();
    let mut reference = session.reference_controller().unwrap();
    controller.start().unwrap();

    let y = [1.0, 0.0];
    for cycle in 0..1000 {
        let y_ct = plant.encrypt_measurement(&y).unwrap();
        let u_ct = controller.step(&y_ct).unwrap();
        let u = plant.decrypt_output(&u_ct).unwrap();
        let expected = reference.step(&y).unwrap();
        assert!(
            (u[0] - expected[0]).abs() < 1e-2,
            "cycle {}: {} vs {}",
            cycle,
            u[0],
            expected[0]
        );
    }

    // The integrator carries no drift.
    let x = plant.decrypt_state(controller.state()).unwrap();
    for (got, want) in x.iter().zip(reference.state()) {
        assert!((got - want).abs() < 1e-2, "{:?} vs {:?}", x, reference.state());
    }
}

#[test]
#[ignore = "production ring dimension; slow in debug builds"]
fn test_e2e_default_session_zero_input_holds_state() {
    let session = SessionBuilder::new(
        SchemeParams::default(),
        ScalingParams::default(),
        ControllerMatrices::pid(&PidGains::default()),
    )
    .with_seed(8)
    .build()
    .unwrap();
    let mut plant = session.plant().unwrap();
    let mut controller = session.controller().unwrap();
    controller.start().unwrap();

    for _ in 0..100 {
        let y_ct = plant.encrypt_measurement(&[0.0, 0.0]).unwrap();
        controller.step(&y_ct).unwrap();
    }
    let x = plant.decrypt_state(controller.state()).unwrap();
    assert!(x.iter().all(|v| v.abs() < 1e-3), "{:?}", x);
}

//! Wire protocol tests over real loopback sockets
//!
//! Frame codec, controller session error handling and the pause/resume
//! control channel.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use encctl::control::{ControllerMatrices, ControllerSession, PidGains};
use encctl::error::ControlError;
use encctl::math::Poly;
use encctl::packing::PackedCiphertext;
use encctl::params::{ScalingParams, SchemeParams};
use encctl::session::{SessionArtifacts, SessionBuilder};
use encctl::shutdown::StopFlag;
use encctl::wire::frame::{FrameHeader, HEADER_LEN};
use encctl::wire::{
    read_expected, spawn_listener, write_frame, CommandSender, ControlCommand, FrameKind,
    PauseFlag,
};

fn make_session(seed: u64) -> SessionArtifacts {
    SessionBuilder::new(
        SchemeParams::insecure_d256(),
        ScalingParams::new(1e-3, 0.1, 1e-10).unwrap(),
        ControllerMatrices::pid(&PidGains {
            kp: 1.0,
            ki: 0.1,
            kd: 0.5,
            lp: 0.2,
            li: 0.1,
            ld: 0.3,
        }),
    )
    .with_seed(seed)
    .build()
    .unwrap()
}

fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

fn wait_for(flag: &PauseFlag, paused: bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while flag.is_paused() != paused {
        assert!(Instant::now() < deadline, "pause flag never became {}", paused);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_ciphertext_frame_over_tcp() {
    let session = make_session(301);
    let mut plant = session.plant().unwrap();
    let (mut client, mut server) = loopback_pair();

    let y = [0.75, -2.5];
    let sent = plant.encrypt_measurement(&y).unwrap();
    write_frame(&mut client, FrameKind::Measurement, &sent).unwrap();

    let received: PackedCiphertext = read_expected(&mut server, FrameKind::Measurement)
        .unwrap()
        .unwrap();
    assert_eq!(received, sent);

    drop(client);
    let end: Option<PackedCiphertext> = read_expected(&mut server, FrameKind::Measurement).unwrap();
    assert!(end.is_none());
}

#[test]
fn test_session_rejects_unexpected_kind() {
    let session = make_session(302);
    let mut plant = session.plant().unwrap();
    let (mut client, mut server) = loopback_pair();

    let controller = session.controller().unwrap();
    let handle = thread::spawn(move || ControllerSession::new(controller).serve(&mut server));

    let y = plant.encrypt_measurement(&[0.0, 0.0]).unwrap();
    write_frame(&mut client, FrameKind::ControlOutput, &y).unwrap();

    assert!(matches!(handle.join().unwrap(), Err(ControlError::Protocol(_))));
}

#[test]
fn test_session_fails_on_malformed_ciphertext() {
    let session = make_session(307);
    let mut plant = session.plant().unwrap();
    let (mut client, mut server) = loopback_pair();

    let controller = session.controller().unwrap();
    let handle = thread::spawn(move || ControllerSession::new(controller).serve(&mut server));

    let mut y = plant.encrypt_measurement(&[0.25, 0.0]).unwrap();
    y.ct.b = Poly::from_coeffs(y.ct.b.coeffs()[..128].to_vec(), session.manifest.scheme.q);
    write_frame(&mut client, FrameKind::Measurement, &y).unwrap();

    assert!(matches!(handle.join().unwrap(), Err(ControlError::Dimension(_))));
}

#[test]
fn test_session_fails_on_truncated_payload() {
    let session = make_session(303);
    let (mut client, mut server) = loopback_pair();

    let controller = session.controller().unwrap();
    let handle = thread::spawn(move || ControllerSession::new(controller).serve(&mut server));

    let header = FrameHeader {
        kind: FrameKind::Measurement,
        len: 4096,
    }
    .encode()
    .unwrap();
    client.write_all(&header).unwrap();
    client.write_all(&[0u8; 100]).unwrap();
    client.flush().unwrap();
    drop(client);

    assert!(matches!(handle.join().unwrap(), Err(ControlError::Frame(_))));
}

#[test]
fn test_session_fails_on_bad_magic() {
    let session = make_session(304);
    let (mut client, mut server) = loopback_pair();

    let controller = session.controller().unwrap();
    let handle = thread::spawn(move || ControllerSession::new(controller).serve(&mut server));

    client.write_all(&[b'X'; HEADER_LEN]).unwrap();
    client.flush().unwrap();

    assert!(matches!(handle.join().unwrap(), Err(ControlError::Frame(_))));
}

#[test]
fn test_session_ends_cleanly_on_disconnect() {
    let session = make_session(305);
    let (client, mut server) = loopback_pair();

    let controller = session.controller().unwrap();
    let handle = thread::spawn(move || ControllerSession::new(controller).serve(&mut server));
    drop(client);

    let report = handle.join().unwrap().unwrap();
    assert_eq!(report.cycles, 0);
}

#[test]
fn test_session_honors_stop_before_first_cycle() {
    let session = make_session(306);
    let (_client, mut server) = loopback_pair();

    let stop = StopFlag::new();
    stop.request_stop();
    let mut serve = ControllerSession::new(session.controller().unwrap()).with_stop(stop);
    let report = serve.serve(&mut server).unwrap();
    assert_eq!(report.cycles, 0);
}

#[test]
fn test_control_channel_toggles_pause() {
    let (controller_side, plant_side) = loopback_pair();

    let flag = PauseFlag::new();
    let listener = spawn_listener(plant_side, flag.clone());
    let mut sender = CommandSender::new(controller_side);

    assert_eq!(sender.toggle().unwrap(), ControlCommand::Pause);
    wait_for(&flag, true);
    assert_eq!(sender.toggle().unwrap(), ControlCommand::Resume);
    wait_for(&flag, false);

    drop(sender);
    listener.join().unwrap();
    assert!(!flag.is_paused());
}

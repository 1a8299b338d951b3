mod common;

use armdraw_communication::{DeviceSession, MotionParams, MotionSequencer};
use armdraw_core::{
    ArmGeometry, GcodeProgram, PenState, RobotPoint, RunMode, RunOutcome, SequencerError,
    SequencerEvent, SequencerState,
};
use common::{finish, wait_for_frame, MockDevice};
use std::time::Duration;

use PenState::{Down, Up};

fn sequencer(params: MotionParams) -> MotionSequencer {
    MotionSequencer::new(ArmGeometry::default(), params)
}

fn connected(mock: &MockDevice, params: MotionParams) -> MotionSequencer {
    let mut sequencer = sequencer(params.clone());
    sequencer
        .attach_session(DeviceSession::from_transport(mock.shared(), params))
        .unwrap();
    sequencer
}

fn short_stroke() -> Vec<RobotPoint> {
    vec![
        RobotPoint::new(150.0, 100.0, Up),
        RobotPoint::new(150.0, 100.0, Down),
        RobotPoint::new(160.0, 100.0, Down),
        RobotPoint::new(160.0, 100.0, Up),
    ]
}

/// A long pen-down zigzag that takes a while to draw
fn long_zigzag(points: usize) -> Vec<RobotPoint> {
    let mut path = vec![RobotPoint::new(150.0, 100.0, Up)];
    for i in 0..points {
        let x = if i % 2 == 0 { 150.0 } else { 155.0 };
        path.push(RobotPoint::new(x, 100.0, Down));
    }
    path
}

fn states(events: &[SequencerEvent]) -> Vec<SequencerState> {
    events
        .iter()
        .filter_map(|e| match e {
            SequencerEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

fn progress(events: &[SequencerEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            SequencerEvent::Progress(pct) => Some(*pct),
            _ => None,
        })
        .collect()
}

#[test]
fn test_device_run_homes_draws_and_parks() {
    let mock = MockDevice::new();
    let mut sequencer = connected(&mock, MotionParams::immediate());

    let handle = sequencer.start(short_stroke(), RunMode::Device).unwrap();
    let (events, report) = finish(handle);

    let sent = mock.sent();
    assert_eq!(&sent[..2], &["HOME", "PU"]);
    assert_eq!(&sent[sent.len() - 2..], &["PU", "HOME"]);
    // Six subsampled travel moves, then one move per remaining point
    assert_eq!(mock.count("GOTO"), 9);
    assert_eq!(mock.count("PD"), 1);

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped_unreachable, 0);
    assert_eq!(report.missed_responses, 0);
    assert_eq!(
        states(&events),
        vec![
            SequencerState::Homing,
            SequencerState::Running,
            SequencerState::Completed,
            SequencerState::Idle,
        ]
    );
    assert_eq!(progress(&events).last(), Some(&100.0));
    assert_eq!(sequencer.state(), SequencerState::Idle);
}

#[test]
fn test_long_travel_is_interpolated_and_subsampled() {
    let mock = MockDevice::new();
    let mut sequencer = connected(&mock, MotionParams::immediate());
    let path = vec![
        RobotPoint::new(150.0, 100.0, Up),
        RobotPoint::new(150.0, -100.0, Up),
    ];

    let (events, report) = finish(sequencer.start(path, RunMode::Device).unwrap());

    let interim = events
        .iter()
        .filter(|e| matches!(e, SequencerEvent::InterimPose { .. }))
        .count();
    assert_eq!(interim, 42);
    assert_eq!(mock.count("GOTO"), 12);
    assert_eq!(mock.count("PD"), 0);
    assert_eq!(report.outcome, RunOutcome::Completed);
}

#[test]
fn test_unreachable_points_are_skipped() {
    let mut sequencer = sequencer(MotionParams::immediate());
    let path = vec![
        RobotPoint::new(150.0, 100.0, Up),
        RobotPoint::new(500.0, 500.0, Up),
        RobotPoint::new(150.0, 110.0, Up),
    ];

    let (events, report) = finish(sequencer.start(path, RunMode::Simulation).unwrap());

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.skipped_unreachable, 1);
    assert_eq!(report.processed, 2);
    let frames: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            SequencerEvent::Frame { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec![0, 2]);
    assert!(events
        .iter()
        .any(|e| matches!(e, SequencerEvent::Warning(msg) if msg.contains("Point 1"))));
    assert_eq!(progress(&events).len(), 4);
}

#[test]
fn test_write_failure_faults_and_lifts_the_pen() {
    let mock = MockDevice::failing_on("PD");
    let mut sequencer = connected(&mock, MotionParams::immediate());

    let (events, report) = finish(sequencer.start(short_stroke(), RunMode::Device).unwrap());

    assert!(matches!(report.outcome, RunOutcome::Faulted(_)));
    assert_eq!(mock.sent().last().map(String::as_str), Some("PU"));
    assert!(mock.is_closed());
    assert!(states(&events).contains(&SequencerState::Faulted));
    assert_eq!(sequencer.state(), SequencerState::Idle);
    assert!(!sequencer.is_connected());
}

#[test]
fn test_second_start_is_rejected_while_running() {
    let params = MotionParams {
        simulation_point_delay: Duration::from_millis(20),
        ..MotionParams::immediate()
    };
    let mut sequencer = sequencer(params);
    let path = vec![RobotPoint::new(150.0, 100.0, Up); 50];

    let handle = sequencer.start(path.clone(), RunMode::Simulation).unwrap();
    assert_eq!(
        sequencer.start(path, RunMode::Simulation).err(),
        Some(SequencerError::AlreadyRunning)
    );

    handle.stop();
    let (_, report) = finish(handle);
    assert_eq!(report.outcome, RunOutcome::StoppedEarly { emergency: false });
    assert!(report.processed < 50);
}

#[test]
fn test_start_validates_input_and_connection() {
    let mut sequencer = sequencer(MotionParams::immediate());

    assert_eq!(
        sequencer.start(Vec::new(), RunMode::Simulation).err(),
        Some(SequencerError::EmptyPath)
    );
    assert_eq!(
        sequencer.start(short_stroke(), RunMode::Device).err(),
        Some(SequencerError::NotConnected)
    );
    assert_eq!(
        sequencer
            .start_gcode(GcodeProgram::from_text("G21\n"))
            .err(),
        Some(SequencerError::NotConnected)
    );
    assert_eq!(sequencer.state(), SequencerState::Idle);
}

#[test]
fn test_stop_lifts_the_pen_and_homes() {
    let mock = MockDevice::new();
    let params = MotionParams {
        draw_point_delay: Duration::from_millis(5),
        ..MotionParams::immediate()
    };
    let mut sequencer = connected(&mock, params);

    let mut handle = sequencer.start(long_zigzag(200), RunMode::Device).unwrap();
    wait_for_frame(&mut handle, 5);
    handle.stop();
    let (events, report) = finish(handle);

    assert_eq!(report.outcome, RunOutcome::StoppedEarly { emergency: false });
    assert!(report.processed < report.total);
    let sent = mock.sent();
    assert_eq!(&sent[sent.len() - 2..], &["PU", "HOME"]);
    assert!(states(&events).contains(&SequencerState::Stopping));
}

#[test]
fn test_emergency_stop_sends_stop_then_pen_up() {
    let mock = MockDevice::new();
    let params = MotionParams {
        draw_point_delay: Duration::from_millis(5),
        ..MotionParams::immediate()
    };
    let mut sequencer = connected(&mock, params);

    let mut handle = sequencer.start(long_zigzag(200), RunMode::Device).unwrap();
    wait_for_frame(&mut handle, 5);
    handle.emergency_stop().unwrap();
    let (events, report) = finish(handle);

    assert_eq!(report.outcome, RunOutcome::StoppedEarly { emergency: true });
    let sent = mock.sent();
    let stop_at = sent.iter().position(|c| c == "STOP").expect("STOP sent");
    assert_eq!(sent.last().map(String::as_str), Some("PU"));
    assert!(!sent[stop_at..].iter().any(|c| c == "HOME"));
    let states = states(&events);
    assert!(states.contains(&SequencerState::Stopping));
    assert_eq!(
        &states[states.len() - 2..],
        &[SequencerState::Completed, SequencerState::Idle]
    );
    assert_eq!(sequencer.state(), SequencerState::Idle);
}

#[test]
fn test_emergency_stop_during_homing_never_starts_drawing() {
    let mock = MockDevice::new();
    let params = MotionParams {
        homing_settle: Duration::from_millis(200),
        ..MotionParams::immediate()
    };
    let mut sequencer = connected(&mock, params);

    let handle = sequencer.start(short_stroke(), RunMode::Device).unwrap();
    assert_eq!(handle.state(), SequencerState::Homing);
    handle.emergency_stop().unwrap();
    assert_eq!(handle.state(), SequencerState::Stopping);
    let (events, report) = finish(handle);

    assert_eq!(report.outcome, RunOutcome::StoppedEarly { emergency: true });
    assert_eq!(report.processed, 0);
    assert_eq!(
        states(&events),
        vec![
            SequencerState::Homing,
            SequencerState::Stopping,
            SequencerState::Completed,
            SequencerState::Idle,
        ]
    );
    assert_eq!(mock.count("GOTO"), 0);
    assert_eq!(mock.count("HOME"), 1);
    assert_eq!(mock.sent().last().map(String::as_str), Some("PU"));
}

#[test]
fn test_event_stream_ends_once_the_worker_exits() {
    let mut sequencer = sequencer(MotionParams::immediate());
    let mut handle = sequencer.start(short_stroke(), RunMode::Simulation).unwrap();
    let _control = handle.control();

    let mut events = Vec::new();
    while let Some(event) = handle.next_event() {
        events.push(event);
    }

    assert!(matches!(events.last(), Some(SequencerEvent::Finished(_))));
    assert_eq!(handle.next_event(), None);
    assert_eq!(handle.join().unwrap().outcome, RunOutcome::Completed);
}

#[test]
fn test_cloned_control_stops_run_from_another_thread() {
    let mock = MockDevice::new();
    let params = MotionParams {
        draw_point_delay: Duration::from_millis(5),
        ..MotionParams::immediate()
    };
    let mut sequencer = connected(&mock, params);

    let mut handle = sequencer.start(long_zigzag(200), RunMode::Device).unwrap();
    let control = handle.control();
    wait_for_frame(&mut handle, 3);
    std::thread::spawn(move || control.stop()).join().unwrap();
    let (_, report) = finish(handle);

    assert_eq!(report.outcome, RunOutcome::StoppedEarly { emergency: false });
    let sent = mock.sent();
    assert_eq!(&sent[sent.len() - 2..], &["PU", "HOME"]);
}

#[test]
fn test_emergency_stop_while_idle_halts_and_lifts() {
    let mock = MockDevice::new();
    let sequencer = connected(&mock, MotionParams::immediate());

    sequencer.emergency_stop().unwrap();

    assert_eq!(mock.sent(), vec!["STOP", "PU"]);
}

#[test]
fn test_gcode_stream_skips_comments_and_blank_lines() {
    let mock = MockDevice::new();
    let mut sequencer = connected(&mock, MotionParams::immediate());
    let program = GcodeProgram::from_text("; header\nG21\n\nG0 X1 Y1\n; note\nG1 X2 Y2\n");

    let (events, report) = finish(sequencer.start_gcode(program).unwrap());

    assert_eq!(mock.sent(), vec!["G21", "G0 X1 Y1", "G1 X2 Y2"]);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 3);
    let pct = progress(&events);
    assert_eq!(pct.len(), 4);
    assert!((pct[0] - 200.0 / 6.0).abs() < 1e-9);
    assert_eq!(pct.last(), Some(&100.0));
}

#[test]
fn test_gcode_stream_rejects_comment_only_program() {
    let mock = MockDevice::new();
    let mut sequencer = connected(&mock, MotionParams::immediate());

    assert_eq!(
        sequencer
            .start_gcode(GcodeProgram::from_text("; nothing\n\n"))
            .err(),
        Some(SequencerError::EmptyProgram)
    );
    assert!(mock.sent().is_empty());
}

#[test]
fn test_gcode_stream_fault_sends_lift_line() {
    let mock = MockDevice::failing_on("G0 X1");
    let mut sequencer = connected(&mock, MotionParams::immediate());
    let program = GcodeProgram::from_text("G21\nG0 X1 Y1\nG1 X2 Y2\n");

    let (_, report) = finish(sequencer.start_gcode(program).unwrap());

    assert!(matches!(report.outcome, RunOutcome::Faulted(_)));
    assert_eq!(report.processed, 1);
    assert_eq!(mock.sent(), vec!["G21", "G0 Z5"]);
    assert!(!sequencer.is_connected());
}

//! Integration tests for the streaming session against the mock transport.
//!
//! The mock advances a virtual monotonic clock by `scans_per_read /
//! scan_rate` per read, so even the full three-second acquisition scenario
//! runs in microseconds of wall time.

use std::sync::Arc;
use std::time::Duration;

use stream_daq::error::StreamError;
use stream_daq::hardware::mock::{error_code, MockStreamDevice};
use stream_daq::hardware::DeviceSelector;
use stream_daq::stream::session::{shutdown_channel, SessionState, StreamSession};
use stream_daq::stream::waveform::{sine_table, OutputWaveform};
use stream_daq::stream::ScanPlan;

const AIN_ADDRESSES: [u32; 4] = [0, 6, 4, 2]; // AIN0, AIN3, AIN2, AIN1
const STREAM_OUT0: u32 = 4800;
const DAC0: u32 = 1000;

fn full_scenario_session(
    transport: Arc<MockStreamDevice>,
) -> StreamSession<MockStreamDevice> {
    let scan = ScanPlan::new(&AIN_ADDRESSES, &[STREAM_OUT0], 10_000.0, 5000).unwrap();
    let waveform = OutputWaveform::new(sine_table(500, 1.0, 2.5), DAC0, 0).unwrap();
    StreamSession::new(transport, scan, waveform, Duration::from_secs(3))
}

// =============================================================================
// Completion path
// =============================================================================

#[tokio::test]
async fn three_second_scenario_produces_expected_matrix() {
    let transport = Arc::new(MockStreamDevice::new());
    let mut session = full_scenario_session(transport.clone());
    let (_tx, rx) = shutdown_channel();

    let outcome = session.run(&DeviceSelector::any(), rx).await.unwrap();

    // Stops only once elapsed >= 3,000,000 us.
    assert!(outcome.elapsed_us >= 3_000_000);

    // 4 input columns; at least (3 s * 10 kHz) - scans_per_read rows. The
    // deadline is checked between reads, so the count overshoots rather than
    // undershoots; with the virtual clock it lands on exactly 6 reads.
    assert_eq!(outcome.matrix.columns(), 4);
    assert!(outcome.matrix.rows() >= 3 * 10_000 - 5000);
    assert_eq!(outcome.matrix.rows(), 30_000);

    // Achieved rate is surfaced from the device, near but not equal to the
    // request.
    assert!((outcome.actual_scan_rate - 10_000.0).abs() < 10.0);
    assert!(outcome.actual_scan_rate != 10_000.0);

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(transport.open_calls(), 1);
    assert_eq!(transport.close_calls(), 1);
    assert!(!transport.is_streaming());
}

#[tokio::test]
async fn matrix_reflects_waveform_loopback() {
    let transport = Arc::new(MockStreamDevice::new());
    let mut session = full_scenario_session(transport);
    let (_tx, rx) = shutdown_channel();

    let outcome = session.run(&DeviceSelector::any(), rx).await.unwrap();

    // The mock loops the stream-out table back on the inputs: scan s, input
    // column c reads table[s % 500] + c/1000.
    let table = sine_table(500, 1.0, 2.5);
    for s in [0usize, 1, 499, 500, 12_345] {
        for c in 0..4 {
            let expected = table[s % 500] + c as f64 * 1e-3;
            let got = outcome.matrix.get(s, c);
            assert!(
                (got - expected).abs() < 1e-9,
                "scan {s} channel {c}: expected {expected}, got {got}"
            );
        }
    }
}

// =============================================================================
// Failure paths
// =============================================================================

#[tokio::test]
async fn read_failure_reports_stream_read_and_tears_down_once() {
    let transport = Arc::new(MockStreamDevice::new().fail_read_at(3));
    let mut session = full_scenario_session(transport.clone());
    let (_tx, rx) = shutdown_channel();

    let err = session.run(&DeviceSelector::any(), rx).await.unwrap_err();

    match &err {
        StreamError::StreamRead(source) => {
            assert_eq!(source.code, error_code::SYNCHRONIZATION_LOST)
        }
        other => panic!("expected StreamRead, got {other:?}"),
    }
    // The device code survives to the caller.
    assert_eq!(err.device_code(), Some(error_code::SYNCHRONIZATION_LOST));

    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(transport.stop_calls(), 1, "teardown must stop exactly once");
    assert_eq!(transport.close_calls(), 1, "teardown must close exactly once");
}

#[tokio::test]
async fn open_failure_surfaces_selectors_without_teardown() {
    let transport = Arc::new(MockStreamDevice::new().fail_open());
    let mut session = full_scenario_session(transport.clone());
    let (_tx, rx) = shutdown_channel();

    let err = session.run(&DeviceSelector::any(), rx).await.unwrap_err();

    assert!(matches!(err, StreamError::DeviceOpen { .. }));
    assert!(err.to_string().contains("identifier=ANY"));
    // Nothing was opened, so nothing to close.
    assert_eq!(transport.close_calls(), 0);
}

#[tokio::test]
async fn five_output_slots_fail_before_any_device_interaction() {
    let transport = Arc::new(MockStreamDevice::new());
    let outputs = [4800, 4801, 4802, 4803, 4804];

    let err = ScanPlan::new(&AIN_ADDRESSES, &outputs, 10_000.0, 5000).unwrap_err();

    assert!(matches!(err, StreamError::Configuration(_)));
    assert_eq!(transport.open_calls(), 0);
}

// =============================================================================
// Interrupt path
// =============================================================================

#[tokio::test]
async fn raised_shutdown_signal_interrupts_and_tears_down_once() {
    let transport = Arc::new(MockStreamDevice::new());
    let mut session = full_scenario_session(transport.clone());
    let (tx, rx) = shutdown_channel();

    // Signal before the loop starts: observed no later than the next
    // read-call boundary.
    tx.send(true).unwrap();
    let err = session.run(&DeviceSelector::any(), rx).await.unwrap_err();

    assert!(matches!(err, StreamError::Interrupted));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(transport.stop_calls(), 1);
    assert_eq!(transport.close_calls(), 1);
    assert!(!transport.is_streaming());
}

#[tokio::test]
async fn dropped_shutdown_sender_is_not_a_signal() {
    let transport = Arc::new(MockStreamDevice::new());
    let mut session = full_scenario_session(transport);
    let (tx, rx) = shutdown_channel();
    drop(tx);

    // The session must run to its deadline, not treat the hangup as ctrl-c.
    let outcome = session.run(&DeviceSelector::any(), rx).await.unwrap();
    assert!(outcome.elapsed_us >= 3_000_000);
}

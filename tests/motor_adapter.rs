//! End-to-end tests for the generic motor adapter over mock hardware.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use beamline_motors::config::MotorConfig;
use beamline_motors::hardware::mock::MockAxis;
use beamline_motors::hardware::AxisRegistry;
use beamline_motors::motor::{AxisMotor, Motor, MotorState};
use beamline_motors::signal::{MotorEvent, MotorSignal};
use beamline_motors::MotorError;

fn dtox_config() -> MotorConfig {
    MotorConfig {
        username: Some("Detector Distance".into()),
        axis: "dtox".into(),
        tolerance: Some(1e-2),
    }
}

fn station_with(axis: MockAxis) -> (AxisRegistry, Arc<MockAxis>) {
    let axis = Arc::new(axis);
    let mut registry = AxisRegistry::new();
    registry.register(Arc::clone(&axis) as Arc<dyn beamline_motors::hardware::Axis>);
    (registry, axis)
}

#[tokio::test]
async fn initializes_from_config_and_reads_through() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_position(350.0));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    assert_eq!(motor.username(), "Detector Distance");
    assert_eq!(motor.get_value().await.unwrap(), Some(350.0));
    assert_eq!(motor.get_state().await.unwrap(), MotorState::Ready);
    assert_eq!(motor.get_velocity().await.unwrap(), 2.0);
}

#[tokio::test]
async fn unresolvable_axis_fails_initialization() {
    let registry = AxisRegistry::new();
    let err = AxisMotor::initialize(&registry, &dtox_config()).unwrap_err();
    assert!(matches!(err, MotorError::UnresolvedAxis(name) if name == "dtox"));
}

#[tokio::test]
async fn null_limits_map_to_sentinels_exactly() {
    let (registry, _axis) = station_with(MockAxis::new("dtox"));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();
    assert_eq!(motor.get_limits().await.unwrap(), (-1e6, 1e6));
}

#[tokio::test]
async fn partial_limits_keep_the_configured_bound() {
    let (registry, _axis) =
        station_with(MockAxis::new("dtox").with_limits(None, Some(800.0)));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();
    assert_eq!(motor.get_limits().await.unwrap(), (-1e6, 800.0));
}

#[tokio::test]
async fn unrecognized_state_name_yields_unknown() {
    let (registry, axis) = station_with(MockAxis::new("dtox"));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    axis.set_state_names(vec!["SPARKLING"]);
    assert_eq!(motor.get_state().await.unwrap(), MotorState::Unknown);
}

#[tokio::test]
async fn moving_state_is_reported_during_motion() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_speed(50.0));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    motor.set_value(10.0, false, None).await.unwrap();
    assert_eq!(motor.get_state().await.unwrap(), MotorState::Moving);
    assert!(!motor.is_ready().await.unwrap());

    motor.wait_move(Some(Duration::from_secs(2))).await.unwrap();
    assert_eq!(motor.get_state().await.unwrap(), MotorState::Ready);
}

#[tokio::test]
async fn bounded_wait_fails_with_timeout_error() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_speed(0.1));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    motor.set_value(500.0, false, None).await.unwrap();
    let err = motor
        .wait_move(Some(Duration::from_millis(30)))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MotorError>(),
        Some(MotorError::Timeout(_))
    ));

    motor.stop().await.unwrap();
    motor.wait_move(Some(Duration::from_secs(1))).await.unwrap();
}

#[tokio::test]
async fn set_value_with_timeout_propagates_timeout() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_speed(0.1));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    let err = motor
        .set_value(500.0, false, Some(Duration::from_millis(30)))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MotorError>(),
        Some(MotorError::Timeout(_))
    ));
    motor.stop().await.unwrap();
}

#[tokio::test]
async fn stop_leaves_position_where_it_was() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_speed(1.0));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    motor.set_value(100.0, false, None).await.unwrap();
    motor.stop().await.unwrap();
    motor.wait_move(Some(Duration::from_secs(1))).await.unwrap();

    assert_eq!(motor.get_value().await.unwrap(), Some(0.0));
}

#[tokio::test]
async fn completed_move_publishes_position_and_state() {
    let (registry, _axis) = station_with(MockAxis::new("dtox").with_speed(10_000.0));
    let motor = AxisMotor::initialize(&registry, &dtox_config()).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    for signal in [
        MotorSignal::PositionChanged,
        MotorSignal::ValueChanged,
        MotorSignal::StateChanged,
    ] {
        let events = Arc::clone(&events);
        motor.signals().connect(signal, move |event| {
            events.lock().push(event.clone());
        });
    }

    motor.set_value(7.5, true, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = events.lock();
    assert!(events
        .iter()
        .any(|e| *e == MotorEvent::PositionChanged(Some(7.5))));
    assert!(events
        .iter()
        .any(|e| *e == MotorEvent::ValueChanged(Some(7.5))));
    assert!(events
        .iter()
        .any(|e| *e == MotorEvent::StateChanged(MotorState::Ready)));
}

//! Edge case and boundary condition tests for the valve controller

use jiff::Timestamp;
use valve_cycler::{
    config::{Config, ControlMode, TelemetryConfig, ValveConfig},
    hal::{
        MockCell, MockClock, MockCommandInput, MockDelay, MockIndicator, MockPowerMonitor,
        MockServo,
    },
    timer_target, Clock, CommandInput, ConfigError, MoveResult, PositionController,
    ValvePosition,
};

type Controller = PositionController<MockServo, MockPowerMonitor, MockCell, MockIndicator>;

fn started(config: ValveConfig, clock: &MockClock) -> Controller {
    let mut controller = PositionController::new(
        MockServo::new(),
        MockPowerMonitor::new(12_000, 300),
        MockCell::new(),
        MockIndicator::new(),
        config,
    );
    controller.begin(clock, &mut MockDelay::new(), 0).unwrap();
    controller
}

fn at(secs: i64) -> Timestamp {
    Timestamp::from_second(secs).unwrap()
}

// ============================================================================
// Schedule Boundaries
// ============================================================================

#[test]
fn interval_not_dividing_hour_restarts_at_bottom() {
    // 3599 / 7 = 514 (even), so two bottom phases meet at the hour
    assert_eq!(timer_target(at(3599), 7), ValvePosition::Bottom);
    assert_eq!(timer_target(at(3600), 7), ValvePosition::Bottom);
    assert_eq!(timer_target(at(3598), 7), ValvePosition::Bottom);
    assert_eq!(timer_target(at(3597), 7), ValvePosition::Top);
}

#[test]
fn interval_longer_than_hour_is_always_bottom() {
    for secs in [0, 1_800, 3_599, 86_399] {
        assert_eq!(timer_target(at(secs), 4_000), ValvePosition::Bottom);
    }
}

#[test]
fn schedule_before_epoch() {
    // 1969-12-31T23:59:59Z is the last second of an hour
    assert_eq!(timer_target(at(-1), 30), ValvePosition::Top);
    assert_eq!(timer_target(at(-3600), 30), ValvePosition::Bottom);
}

#[test]
fn schedule_follows_wall_clock_not_uptime() {
    // Booted 45 s into the hour: top immediately, no 30 s of bottom first
    let clock = MockClock::with_wall_secs(45);
    let controller = started(ValveConfig::default(), &clock);
    assert_eq!(controller.current_position(), ValvePosition::Top);
}

#[test]
fn wall_clock_jump_is_followed_on_next_tick() {
    let mut clock = MockClock::new();
    let mut controller = started(ValveConfig::default(), &clock);

    clock.advance(5_000);
    clock.set_wall(at(30));
    assert_eq!(
        controller.update(&clock.reading(), None).unwrap(),
        Some(MoveResult::Moved(ValvePosition::Top))
    );
}

// ============================================================================
// Voltage Boundaries
// ============================================================================

#[test]
fn one_millivolt_below_threshold_is_low() {
    let mut clock = MockClock::new();
    let mut controller = started(ValveConfig::default(), &clock);

    controller.power_mut().set_voltage_mv(9_999);
    clock.advance(100);
    assert_eq!(
        controller.update(&clock.reading(), None).unwrap(),
        Some(MoveResult::MovedToHome)
    );
}

#[test]
fn negative_bus_voltage_is_low() {
    let mut clock = MockClock::new();
    let mut controller = started(ValveConfig::default(), &clock);

    controller.power_mut().set_voltage_mv(-50);
    clock.advance(100);
    controller.update(&clock.reading(), None).unwrap();
    assert_eq!(controller.current_position(), ValvePosition::Home);
}

#[test]
fn zero_threshold_never_trips() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_low_voltage_threshold_mv(0),
        &clock,
    );

    controller.power_mut().set_voltage_mv(0);
    clock.advance(100);
    assert_eq!(controller.update(&clock.reading(), None).unwrap(), None);
    assert_eq!(controller.current_position(), ValvePosition::Bottom);
}

#[test]
fn low_voltage_at_boot_goes_home_on_first_tick() {
    let mut clock = MockClock::new();
    let mut controller = PositionController::new(
        MockServo::new(),
        MockPowerMonitor::new(3_000, 0),
        MockCell::new(),
        MockIndicator::new(),
        ValveConfig::default(),
    );

    // Startup always drives a side
    assert_eq!(
        controller.begin(&clock, &mut MockDelay::new(), 0).unwrap(),
        ValvePosition::Bottom
    );

    clock.advance(20);
    controller.update(&clock.reading(), None).unwrap();
    assert_eq!(controller.current_position(), ValvePosition::Home);
}

// ============================================================================
// Rapid Command Sequences
// ============================================================================

#[test]
fn one_byte_per_tick() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );
    let mut input = MockCommandInput::new();
    input.push(b"tbt");

    clock.set(5_000);
    controller
        .update(&clock.reading(), input.read_byte())
        .unwrap();

    assert_eq!(controller.current_position(), ValvePosition::Top);
    assert_eq!(input.pending(), 2);
}

#[test]
fn suppressed_command_is_not_replayed() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );

    clock.set(500);
    assert_eq!(
        controller.update(&clock.reading(), Some(b't')).unwrap(),
        Some(MoveResult::Suppressed)
    );

    // Rate limit over, but the byte was consumed
    clock.set(5_000);
    assert_eq!(controller.update(&clock.reading(), None).unwrap(), None);
    assert_eq!(controller.current_position(), ValvePosition::Bottom);
}

#[test]
fn repeated_command_for_current_side_is_noop() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );

    for i in 1..=5 {
        clock.set(i * 3_000);
        assert_eq!(controller.update(&clock.reading(), Some(b'b')).unwrap(), None);
    }
    assert_eq!(controller.servo().writes.len(), 1);
    assert_eq!(controller.state().last_move_ms, Some(0));
}

#[test]
fn noise_bytes_are_ignored() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );

    for (i, byte) in b"T\r\nB x\0".iter().enumerate() {
        clock.set(3_000 + i as u64 * 20);
        assert_eq!(controller.update(&clock.reading(), Some(*byte)).unwrap(), None);
    }
    assert_eq!(controller.current_position(), ValvePosition::Bottom);
}

#[test]
fn command_from_home_after_recovery() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );

    controller.power_mut().set_voltage_mv(0);
    clock.set(100);
    controller.update(&clock.reading(), None).unwrap();
    assert_eq!(controller.current_position(), ValvePosition::Home);

    // Bottom is a real move away from home
    controller.power_mut().set_voltage_mv(12_000);
    clock.set(2_100);
    assert_eq!(
        controller.update(&clock.reading(), Some(b'b')).unwrap(),
        Some(MoveResult::Moved(ValvePosition::Bottom))
    );
}

#[test]
fn zero_min_interval_allows_back_to_back_moves() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default()
            .with_mode(ControlMode::External)
            .with_min_move_interval_ms(0),
        &clock,
    );

    for (i, byte) in b"tbtb".iter().enumerate() {
        clock.set(i as u64);
        assert!(matches!(
            controller.update(&clock.reading(), Some(*byte)).unwrap(),
            Some(MoveResult::Moved(_))
        ));
    }
}

// ============================================================================
// Startup Edge Cases
// ============================================================================

#[test]
fn zero_settle_delay_skips_wait() {
    let clock = MockClock::new();
    let mut delay = MockDelay::new();
    let mut controller = PositionController::new(
        MockServo::new(),
        MockPowerMonitor::new(12_000, 0),
        MockCell::new(),
        MockIndicator::new(),
        ValveConfig::default(),
    );
    controller.begin(&clock, &mut delay, 0).unwrap();
    assert_eq!(delay.calls, 0);
}

#[test]
fn first_move_after_boot_is_rate_limited() {
    let mut clock = MockClock::new();
    let mut controller = started(
        ValveConfig::default().with_mode(ControlMode::External),
        &clock,
    );

    clock.set(1_999);
    assert_eq!(
        controller.update(&clock.reading(), Some(b't')).unwrap(),
        Some(MoveResult::Suppressed)
    );
}

#[test]
fn servo_failure_at_boot_is_reported() {
    let clock = MockClock::new();
    let mut servo = MockServo::new();
    servo.fail = true;
    let mut controller = PositionController::new(
        servo,
        MockPowerMonitor::new(12_000, 0),
        MockCell::new(),
        MockIndicator::new(),
        ValveConfig::default(),
    );
    assert!(controller.begin(&clock, &mut MockDelay::new(), 0).is_err());
    assert_eq!(controller.cell().writes, 0);
}

// ============================================================================
// Configuration Limits
// ============================================================================

#[test]
fn home_must_sit_between_sides() {
    let config =
        Config::default().with_valve(ValveConfig::default().with_pulses_us(1205, 1795, 1205));
    assert!(matches!(
        config.validate(),
        Err(ConfigError::HomeOutsideTravel { .. })
    ));
}

#[test]
fn reversed_servo_travel_is_valid() {
    let config =
        Config::default().with_valve(ValveConfig::default().with_pulses_us(1795, 1205, 1500));
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn empty_file_prefix_rejected() {
    let config =
        Config::default().with_telemetry(TelemetryConfig::default().with_file_prefix(""));
    assert_eq!(config.validate(), Err(ConfigError::EmptyFilePrefix));
}

#[test]
fn oversized_file_prefix_is_truncated() {
    let prefix = "x".repeat(100);
    let telemetry = TelemetryConfig::default().with_file_prefix(&prefix);
    assert!(!telemetry.file_prefix.is_empty());
    assert!(telemetry.file_prefix.len() <= 32);
}

//! Reaction to the driver's user and calibration events.

use tracing::{debug, info, warn};

use crate::sensor::{CalibrationStatus, SensorEvent};
use crate::skeleton::UserId;

/// Driver command issued in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationCommand {
    RequestCalibration(UserId),
    StartTracking(UserId),
}

/// Map one event to the command the loop should issue, if any.
///
/// A failed calibration is retried unless it was aborted manually.
pub fn command_for_event(event: &SensorEvent) -> Option<CalibrationCommand> {
    match event {
        SensorEvent::NewUser(user) => {
            info!("New user {}", user);
            Some(CalibrationCommand::RequestCalibration(*user))
        }
        SensorEvent::LostUser(user) => {
            info!("Lost user {}", user);
            None
        }
        SensorEvent::CalibrationStart(user) => {
            debug!("Calibration started for {}", user);
            None
        }
        SensorEvent::CalibrationComplete { user, status } => match status {
            CalibrationStatus::Ok => {
                info!("Calibration complete for {}, start tracking", user);
                Some(CalibrationCommand::StartTracking(*user))
            }
            CalibrationStatus::ManualAbort => {
                warn!("Calibration of {} manually aborted", user);
                None
            }
            CalibrationStatus::Failed(reason) => {
                warn!("Calibration of {} failed ({}), retrying", user, reason);
                Some(CalibrationCommand::RequestCalibration(*user))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(3);

    fn complete(status: CalibrationStatus) -> SensorEvent {
        SensorEvent::CalibrationComplete { user: USER, status }
    }

    #[test]
    fn test_new_user_requests_calibration() {
        assert_eq!(
            command_for_event(&SensorEvent::NewUser(USER)),
            Some(CalibrationCommand::RequestCalibration(USER))
        );
    }

    #[test]
    fn test_calibration_outcomes() {
        assert_eq!(
            command_for_event(&complete(CalibrationStatus::Ok)),
            Some(CalibrationCommand::StartTracking(USER))
        );
        assert_eq!(command_for_event(&complete(CalibrationStatus::ManualAbort)), None);
        assert_eq!(
            command_for_event(&complete(CalibrationStatus::Failed("timeout".into()))),
            Some(CalibrationCommand::RequestCalibration(USER))
        );
    }

    #[test]
    fn test_informational_events() {
        assert_eq!(command_for_event(&SensorEvent::LostUser(USER)), None);
        assert_eq!(command_for_event(&SensorEvent::CalibrationStart(USER)), None);
    }
}

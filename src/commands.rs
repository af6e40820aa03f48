//! External commands and move outcomes.
//!
//! In [`ControlMode::External`](crate::config::ControlMode::External) the
//! valve follows single bytes read from the command input:
//!
//! | Byte | Command |
//! |------|---------|
//! | `t` | [`ValveCommand::Top`] |
//! | `b` | [`ValveCommand::Bottom`] |
//!
//! Every other byte is ignored. There is no framing, no acknowledgment and no
//! debouncing; the controller's rate limiter is the only guard against a
//! chattering input.
//!
//! # Move Outcomes
//!
//! When the controller attempts a move it returns a [`MoveResult`]:
//!
//! - [`MoveResult::Moved`]: the valve was driven to the requested side
//! - [`MoveResult::MovedToHome`]: bus voltage was low, the valve went home instead
//! - [`MoveResult::Suppressed`]: the move came too soon after the previous one

use crate::valve::ValvePosition;

/// A recognised external command.
///
/// # Example
///
/// ```rust
/// use valve_cycler::{ValveCommand, ValvePosition};
///
/// assert_eq!(ValveCommand::from_byte(b't'), Some(ValveCommand::Top));
/// assert_eq!(ValveCommand::from_byte(b'b'), Some(ValveCommand::Bottom));
/// assert_eq!(ValveCommand::from_byte(b'T'), None);
///
/// assert_eq!(ValveCommand::Top.target(), ValvePosition::Top);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValveCommand {
    /// Turn the valve to the top.
    Top,
    /// Turn the valve to the bottom.
    Bottom,
}

impl ValveCommand {
    /// Decode a command byte. Matching is exact (lowercase only).
    #[inline]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b't' => Some(ValveCommand::Top),
            b'b' => Some(ValveCommand::Bottom),
            _ => None,
        }
    }

    /// The valve position this command asks for.
    #[inline]
    pub const fn target(&self) -> ValvePosition {
        match self {
            ValveCommand::Top => ValvePosition::Top,
            ValveCommand::Bottom => ValvePosition::Bottom,
        }
    }
}

/// Outcome of a move attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MoveResult {
    /// The valve was driven to the given position.
    Moved(ValvePosition),

    /// Bus voltage was below the threshold; the valve was sent home and the
    /// persisted side was left untouched.
    MovedToHome,

    /// The move was refused by the rate limiter; nothing changed.
    ///
    /// This is a normal outcome, not an error.
    Suppressed,
}

impl MoveResult {
    /// Returns true if the valve position changed or was re-asserted.
    #[inline]
    pub const fn committed(&self) -> bool {
        !matches!(self, MoveResult::Suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_byte() {
        assert_eq!(ValveCommand::from_byte(b't'), Some(ValveCommand::Top));
        assert_eq!(ValveCommand::from_byte(b'b'), Some(ValveCommand::Bottom));
    }

    #[test]
    fn command_from_byte_ignores_everything_else() {
        for byte in [b'T', b'B', b'x', b'\n', b'\r', b' ', 0, 0xFF] {
            assert_eq!(ValveCommand::from_byte(byte), None, "byte {byte:#04x}");
        }
    }

    #[test]
    fn command_targets_are_never_home() {
        assert_eq!(ValveCommand::Top.target(), ValvePosition::Top);
        assert_eq!(ValveCommand::Bottom.target(), ValvePosition::Bottom);
    }

    #[test]
    fn move_result_committed() {
        assert!(MoveResult::Moved(ValvePosition::Top).committed());
        assert!(MoveResult::MovedToHome.committed());
        assert!(!MoveResult::Suppressed.committed());
    }
}

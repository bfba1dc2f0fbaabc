//! Session phase of a device-linking flow

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a link-device session, shared by both roles.
///
/// Phases move forward in the order declared here. `Error` is terminal and
/// reachable from any non-terminal phase; `None` is the only way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkDeviceState {
    #[default]
    None,
    /// Import side only: a token is ready to be shown to the user
    TokenAvailable,
    Connecting,
    Authenticating,
    Importing,
    Done,
    Error,
}

/// How a requested phase change relates to the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moves forward
    Advance,
    /// Same phase delivered again
    Repeat,
    /// Explicit reset to `None`
    Reset,
    /// Non-terminal phase moves to `Error`
    Fail,
    /// Current phase is terminal; the signal arrived after the flow ended
    Late,
    /// Would move a live session backward
    Backward,
}

impl Transition {
    /// Whether the new phase should be applied
    pub fn applies(self) -> bool {
        matches!(
            self,
            Transition::Advance | Transition::Repeat | Transition::Reset | Transition::Fail
        )
    }
}

impl LinkDeviceState {
    /// Forward order of the phase. `Error` ranks after everything.
    pub fn rank(self) -> u8 {
        match self {
            LinkDeviceState::None => 0,
            LinkDeviceState::TokenAvailable => 1,
            LinkDeviceState::Connecting => 2,
            LinkDeviceState::Authenticating => 3,
            LinkDeviceState::Importing => 4,
            LinkDeviceState::Done => 5,
            LinkDeviceState::Error => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LinkDeviceState::Done | LinkDeviceState::Error)
    }

    /// Classify a move from `self` to `to`
    pub fn check_transition(self, to: LinkDeviceState) -> Transition {
        if to == LinkDeviceState::None {
            return Transition::Reset;
        }
        if to == self {
            return Transition::Repeat;
        }
        if self.is_terminal() {
            return Transition::Late;
        }
        if to == LinkDeviceState::Error {
            return Transition::Fail;
        }
        if to.rank() > self.rank() {
            Transition::Advance
        } else {
            Transition::Backward
        }
    }
}

impl fmt::Display for LinkDeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkDeviceState::None => "NONE",
            LinkDeviceState::TokenAvailable => "TOKEN_AVAILABLE",
            LinkDeviceState::Connecting => "CONNECTING",
            LinkDeviceState::Authenticating => "AUTHENTICATING",
            LinkDeviceState::Importing => "IMPORTING",
            LinkDeviceState::Done => "DONE",
            LinkDeviceState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

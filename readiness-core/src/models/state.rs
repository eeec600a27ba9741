use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::DeviceKind;
use super::error::ReadinessError;

/// Which page of the pre-session flow the candidate is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    DeviceCheck,
    Preparation,
}

/// Progress of the device test within the `DeviceCheck` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceTest {
    NotStarted,
    Testing,
    Complete,
}

/// Per-device permission marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Pending,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Granted => "granted",
            Self::Denied => "denied",
        };
        f.write_str(name)
    }
}

/// Readiness state machine.
///
/// The value is immutable from the outside: every change goes through a
/// named transition that consumes `self` and returns the next state, or
/// refuses with `ReadinessError::InvalidTransition`.
///
/// ```text
/// DeviceCheck/NotStarted → DeviceCheck/Testing → DeviceCheck/Complete → Preparation
///          ↑                     │   ↑                  │                    │
///          └──── reset ──────────┘   └── complete_test ─┘       accept_and_proceed
/// ```
///
/// `device_test == Complete` holds iff both camera and microphone are
/// granted: markers can only change while `Testing`, and `complete_test`
/// refuses unless both are granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessState {
    stage: Stage,
    device_test: DeviceTest,
    camera: PermissionStatus,
    microphone: PermissionStatus,
    agreement_accepted: bool,
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self {
            stage: Stage::DeviceCheck,
            device_test: DeviceTest::NotStarted,
            camera: PermissionStatus::Pending,
            microphone: PermissionStatus::Pending,
            agreement_accepted: false,
        }
    }
}

impl ReadinessState {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn device_test(&self) -> DeviceTest {
        self.device_test
    }

    pub fn camera(&self) -> PermissionStatus {
        self.camera
    }

    pub fn microphone(&self) -> PermissionStatus {
        self.microphone
    }

    pub fn agreement_accepted(&self) -> bool {
        self.agreement_accepted
    }

    pub fn is_test_complete(&self) -> bool {
        self.device_test == DeviceTest::Complete
    }

    /// Overall progress: 50 for a completed device test, 50 for the accepted agreement.
    pub fn progress(&self) -> u8 {
        let mut progress = 0;
        if self.is_test_complete() {
            progress += 50;
        }
        if self.agreement_accepted {
            progress += 50;
        }
        progress
    }

    /// `NotStarted → Testing`.
    pub fn begin_test(self) -> Result<Self, ReadinessError> {
        if self.stage != Stage::DeviceCheck || self.device_test != DeviceTest::NotStarted {
            return Err(self.refuse("begin test"));
        }
        Ok(Self {
            device_test: DeviceTest::Testing,
            camera: PermissionStatus::Pending,
            microphone: PermissionStatus::Pending,
            ..self
        })
    }

    /// Record the acquisition outcome for a camera or microphone.
    pub fn record_device(
        self,
        kind: DeviceKind,
        status: PermissionStatus,
    ) -> Result<Self, ReadinessError> {
        if self.device_test != DeviceTest::Testing {
            return Err(self.refuse("record device status"));
        }
        match kind {
            DeviceKind::Camera => Ok(Self {
                camera: status,
                ..self
            }),
            DeviceKind::Microphone => Ok(Self {
                microphone: status,
                ..self
            }),
            DeviceKind::Speaker => Err(ReadinessError::InvalidTransition(
                "speakers carry no permission marker".into(),
            )),
        }
    }

    /// `Testing → Complete` iff camera and microphone are both granted.
    pub fn complete_test(self) -> Result<Self, ReadinessError> {
        if self.device_test != DeviceTest::Testing {
            return Err(self.refuse("complete test"));
        }
        if !(self.camera.is_granted() && self.microphone.is_granted()) {
            return Err(ReadinessError::DevicesNotReady {
                camera: self.camera,
                microphone: self.microphone,
            });
        }
        Ok(Self {
            device_test: DeviceTest::Complete,
            ..self
        })
    }

    /// `Testing | Complete → NotStarted`, clearing every device marker.
    pub fn reset(self) -> Result<Self, ReadinessError> {
        if self.stage != Stage::DeviceCheck || self.device_test == DeviceTest::NotStarted {
            return Err(self.refuse("reset test"));
        }
        Ok(Self {
            device_test: DeviceTest::NotStarted,
            camera: PermissionStatus::Pending,
            microphone: PermissionStatus::Pending,
            ..self
        })
    }

    /// `DeviceCheck → Preparation`, only with a completed device test.
    pub fn advance(self) -> Result<Self, ReadinessError> {
        if self.stage != Stage::DeviceCheck || !self.is_test_complete() {
            return Err(self.refuse("advance to preparation"));
        }
        Ok(Self {
            stage: Stage::Preparation,
            ..self
        })
    }

    /// `Preparation → DeviceCheck`, keeping the completed test.
    pub fn back(self) -> Result<Self, ReadinessError> {
        if self.stage != Stage::Preparation {
            return Err(self.refuse("go back to device check"));
        }
        Ok(Self {
            stage: Stage::DeviceCheck,
            ..self
        })
    }

    /// Toggle the agreement checkbox on the preparation page.
    pub fn set_agreement(self, accepted: bool) -> Result<Self, ReadinessError> {
        if self.stage != Stage::Preparation {
            return Err(self.refuse("change agreement"));
        }
        Ok(Self {
            agreement_accepted: accepted,
            ..self
        })
    }

    /// Guard for the session handoff.
    /// Preparation stage with the agreement accepted.
    pub fn is_ready(&self) -> bool {
        self.ensure_ready_to_proceed().is_ok()
    }

    pub fn ensure_ready_to_proceed(&self) -> Result<(), ReadinessError> {
        if self.stage != Stage::Preparation || !self.agreement_accepted {
            return Err(self.refuse("proceed to session"));
        }
        Ok(())
    }

    fn refuse(&self, action: &str) -> ReadinessError {
        ReadinessError::InvalidTransition(format!(
            "cannot {} from {:?}/{:?}",
            action, self.stage, self.device_test
        ))
    }
}

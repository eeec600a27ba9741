use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ReadinessError;

/// Kind of capture endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Camera,
    Microphone,
    Speaker,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [Self::Camera, Self::Microphone, Self::Speaker];

    fn display_name(&self) -> &'static str {
        match self {
            Self::Camera => "Camera",
            Self::Microphone => "Microphone",
            Self::Speaker => "Speaker",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_name())
    }
}

/// A capture endpoint as reported by the host.
///
/// Rebuilt on every enumeration; `label` is empty until the host has been
/// granted capture permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }

    pub fn has_label(&self) -> bool {
        !self.label.trim().is_empty()
    }

    /// Label for presentation, falling back to "Camera 2" style names for
    /// unlabeled devices. `index` is the zero-based position within its kind.
    pub fn display_label(&self, index: usize) -> String {
        if self.has_label() {
            self.label.clone()
        } else {
            format!("{} {}", self.kind, index + 1)
        }
    }
}

/// Device ids chosen for the test, one slot per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelection {
    pub camera_id: Option<String>,
    pub microphone_id: Option<String>,
    pub speaker_id: Option<String>,
}

impl DeviceSelection {
    pub fn get(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::Camera => self.camera_id.as_deref(),
            DeviceKind::Microphone => self.microphone_id.as_deref(),
            DeviceKind::Speaker => self.speaker_id.as_deref(),
        }
    }

    pub fn set(&mut self, kind: DeviceKind, id: Option<String>) {
        let slot = match kind {
            DeviceKind::Camera => &mut self.camera_id,
            DeviceKind::Microphone => &mut self.microphone_id,
            DeviceKind::Speaker => &mut self.speaker_id,
        };
        *slot = id;
    }
}

/// User-facing message raised for a device that could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNotice {
    pub kind: DeviceKind,
    pub message: String,
    #[serde(skip)]
    pub error: ReadinessError,
}

impl DeviceNotice {
    /// Classify an acquisition failure into the message shown to the candidate.
    pub fn from_error(kind: DeviceKind, error: ReadinessError) -> Self {
        let noun = kind.display_name().to_lowercase();
        let message = match &error {
            ReadinessError::PermissionDenied => format!(
                "{} access was denied. Allow {} access in your browser or system settings and retest.",
                kind, noun
            ),
            ReadinessError::DeviceNotFound => format!(
                "No {} was found. Connect a {} and retest.",
                noun, noun
            ),
            other => format!("Could not start the {}: {}", noun, other),
        };
        Self {
            kind,
            message,
            error,
        }
    }
}

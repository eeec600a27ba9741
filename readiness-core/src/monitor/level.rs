use serde::Serialize;

/// Loudness bucket shown next to the microphone meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelClass {
    TooQuiet,
    WorkingWell,
}

impl LevelClass {
    /// Fixed threshold on mean bin energy (0–255).
    pub fn classify(amplitude: f32, quiet_threshold: f32) -> Self {
        if amplitude < quiet_threshold {
            Self::TooQuiet
        } else {
            Self::WorkingWell
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::TooQuiet => "Too quiet. Speak to test your microphone.",
            Self::WorkingWell => "Microphone is working well.",
        }
    }
}

/// One loudness reading; not retained past the tick that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioLevel {
    /// Mean bin energy, 0.0–255.0.
    pub amplitude: f32,
    pub class: LevelClass,
}

impl AudioLevel {
    pub fn new(amplitude: f32, quiet_threshold: f32) -> Self {
        let amplitude = amplitude.clamp(0.0, 255.0);
        Self {
            amplitude,
            class: LevelClass::classify(amplitude, quiet_threshold),
        }
    }

    /// Meter fill, 0.0–1.0.
    pub fn normalized(&self) -> f32 {
        self.amplitude / 255.0
    }
}

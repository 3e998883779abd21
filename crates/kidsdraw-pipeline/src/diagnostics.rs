//! Conversion diagnostics: per-stage timing for tuning and benchmarking.
//!
//! The pipeline is sans-IO, so it never reads a clock itself. Callers
//! that want timings pass a [`Clock`]; plain conversions use an internal
//! clock that always reports zero.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::progress::Observer;
use crate::style::{self, StageRunner};
use crate::types::{ConversionError, ConversionParameters, Dimensions, RgbaImage, StyleKind};

/// A monotonic time source.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Clock that never advances.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: &Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration must be finite and non-negative seconds"))
    }
}

/// Timing of one stage group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name from [`StyleKind::stage_names`].
    pub name: String,
    /// Progress fraction emitted when this stage finished.
    pub checkpoint: f32,
    /// Wall-clock duration of the stage.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Diagnostics collected from one successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionDiagnostics {
    /// Style that ran.
    pub style: StyleKind,
    /// Parameters it ran with.
    pub params: ConversionParameters,
    /// Input (and output) dimensions.
    pub dimensions: Dimensions,
    /// One entry per stage group, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// End-to-end duration.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl ConversionDiagnostics {
    /// Look up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Human-readable table of stage timings.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Conversion Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Style: {}  |  line thickness {}  contrast {}  saturation {}",
            self.style, self.params.line_thickness, self.params.contrast, self.params.saturation,
        ));
        lines.push(format!(
            "Image: {} ({} pixels)",
            self.dimensions,
            self.dimensions.pixel_count(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10} {:>10}",
            "Stage", "Progress", "Duration", "% Total"
        ));
        lines.push("-".repeat(50));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<16} {:>10.1} {ms:>8.3}ms {pct:>9.1}%",
                stage.name, stage.checkpoint,
            ));
        }

        lines.join("\n")
    }
}

/// Run a conversion and collect per-stage timings with `clock`.
///
/// Progress and cancellation behave exactly as in
/// [`convert_with_observer`](crate::convert_with_observer).
///
/// # Errors
///
/// Same as [`convert`](crate::convert).
pub fn convert_with_diagnostics<C: Clock>(
    image: &RgbaImage,
    style: StyleKind,
    params: &ConversionParameters,
    observer: &dyn Observer,
    clock: &C,
) -> Result<(RgbaImage, ConversionDiagnostics), ConversionError> {
    let start = clock.now();
    let mut runner = StageRunner::new(style, observer, clock);
    let output = style::run(image, style, params, &mut runner)?;
    let stages = runner.into_stages();

    Ok((
        output,
        ConversionDiagnostics {
            style,
            params: *params,
            dimensions: Dimensions::of(image),
            stages,
            total_duration: clock.elapsed(&start),
        },
    ))
}

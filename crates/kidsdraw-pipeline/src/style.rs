//! The three fixed style conversions and the runner that drives them.
//!
//! Each style is a short sequence of stage groups. [`StageRunner`] wraps
//! every group: it polls the observer for cancellation, times the group,
//! checks the output kept the input's dimensions, and then emits the
//! group's progress checkpoint.
//!
//! ```text
//! Outline:  validate → desaturate → edges → contrast → invert
//! Sketch:   validate → desaturate → blur+invert → dodge(inverted, gray) → contrast
//! Cartoon:  validate → median(original) → linework(original) → color(smoothed)
//!           → linework over color
//! ```

use std::convert::Infallible;
use std::fmt::Display;

use crate::blend::{color_dodge_blend, source_over_composite};
use crate::blur::gaussian_blur;
use crate::color::{adjust_contrast, adjust_contrast_saturation, desaturate, invert};
use crate::decode;
use crate::diagnostics::{Clock, StageDiagnostics};
use crate::edge::{detect_edges, edge_strength_alpha};
use crate::median::median_smooth;
use crate::progress::Observer;
use crate::types::{ConversionError, ConversionParameters, Dimensions, RgbaImage, StyleKind};

/// Blur radius (Gaussian sigma) for the Sketch style's inverted layer.
pub const SKETCH_BLUR_RADIUS: f32 = 1.0;

/// Drives one conversion's stage groups against its style's checkpoint
/// table.
pub(crate) struct StageRunner<'a, C: Clock> {
    style: StyleKind,
    observer: &'a dyn Observer,
    clock: &'a C,
    dimensions: Option<Dimensions>,
    stages: Vec<StageDiagnostics>,
}

impl<'a, C: Clock> StageRunner<'a, C> {
    pub(crate) fn new(style: StyleKind, observer: &'a dyn Observer, clock: &'a C) -> Self {
        Self {
            style,
            observer,
            clock,
            dimensions: None,
            stages: Vec::with_capacity(style.checkpoints().len()),
        }
    }

    /// Timings of the groups completed so far.
    pub(crate) fn into_stages(self) -> Vec<StageDiagnostics> {
        self.stages
    }

    /// Validate the input image as the first stage group.
    pub(crate) fn validate(&mut self, image: &RgbaImage) -> Result<(), ConversionError> {
        let (name, checkpoint, start) = self.begin()?;
        self.dimensions = Some(decode::validate(image)?);
        self.finish(name, checkpoint, &start);
        Ok(())
    }

    /// Run an infallible stage group.
    pub(crate) fn apply(
        &mut self,
        op: impl FnOnce() -> RgbaImage,
    ) -> Result<RgbaImage, ConversionError> {
        self.try_apply(|| Ok::<_, Infallible>(op()))
    }

    /// Run a fallible stage group. Operator errors become
    /// [`ConversionError::ProcessingFailed`] tagged with the group name.
    pub(crate) fn try_apply<E: Display>(
        &mut self,
        op: impl FnOnce() -> Result<RgbaImage, E>,
    ) -> Result<RgbaImage, ConversionError> {
        let (name, checkpoint, start) = self.begin()?;

        let output = op().map_err(|e| ConversionError::processing_failed(name, e.to_string()))?;

        if let Some(expected) = self.dimensions {
            let actual = Dimensions::of(&output);
            if actual != expected {
                return Err(ConversionError::processing_failed(
                    name,
                    format!("produced {actual}, expected {expected}"),
                ));
            }
        }

        self.finish(name, checkpoint, &start);
        Ok(output)
    }

    fn begin(&self) -> Result<(&'static str, f32, C::Instant), ConversionError> {
        if self.observer.is_cancelled() {
            tracing::debug!(style = %self.style, completed = self.stages.len(), "conversion cancelled");
            return Err(ConversionError::Cancelled);
        }

        let index = self.stages.len();
        let name = self.style.stage_names().get(index).copied();
        let checkpoint = self.style.checkpoints().get(index).copied();
        match (name, checkpoint) {
            (Some(name), Some(checkpoint)) => Ok((name, checkpoint, self.clock.now())),
            _ => Err(ConversionError::processing_failed(
                self.style.name(),
                format!("no checkpoint defined for stage group {index}"),
            )),
        }
    }

    fn finish(&mut self, name: &'static str, checkpoint: f32, start: &C::Instant) {
        let duration = self.clock.elapsed(start);
        tracing::trace!(style = %self.style, stage = name, checkpoint, ?duration, "stage complete");
        self.stages.push(StageDiagnostics {
            name: name.to_string(),
            checkpoint,
            duration,
        });
        self.observer.progress(checkpoint);
    }
}

/// Dispatch to the style's stage sequence.
pub(crate) fn run<C: Clock>(
    image: &RgbaImage,
    style: StyleKind,
    params: &ConversionParameters,
    runner: &mut StageRunner<'_, C>,
) -> Result<RgbaImage, ConversionError> {
    tracing::debug!(
        %style,
        width = image.width(),
        height = image.height(),
        line_thickness = params.line_thickness,
        contrast = params.contrast,
        saturation = params.saturation,
        "starting conversion"
    );
    match style {
        StyleKind::Outline => outline(image, params, runner),
        StyleKind::Sketch => sketch(image, params, runner),
        StyleKind::Cartoon => cartoon(image, params, runner),
    }
}

fn outline<C: Clock>(
    image: &RgbaImage,
    params: &ConversionParameters,
    runner: &mut StageRunner<'_, C>,
) -> Result<RgbaImage, ConversionError> {
    runner.validate(image)?;
    let gray = runner.apply(|| desaturate(image))?;
    let edges = runner.apply(|| detect_edges(&gray, params.edge_intensity()))?;
    let contrasted = runner.apply(|| adjust_contrast(&edges, params.contrast_factor()))?;
    runner.apply(|| invert(&contrasted))
}

fn sketch<C: Clock>(
    image: &RgbaImage,
    params: &ConversionParameters,
    runner: &mut StageRunner<'_, C>,
) -> Result<RgbaImage, ConversionError> {
    runner.validate(image)?;
    let gray = runner.apply(|| desaturate(image))?;
    let inverted_blur = runner.apply(|| invert(&gaussian_blur(&gray, SKETCH_BLUR_RADIUS)))?;
    let dodged = runner.try_apply(|| color_dodge_blend(&inverted_blur, &gray))?;
    runner.apply(|| adjust_contrast(&dodged, params.contrast_factor()))
}

fn cartoon<C: Clock>(
    image: &RgbaImage,
    params: &ConversionParameters,
    runner: &mut StageRunner<'_, C>,
) -> Result<RgbaImage, ConversionError> {
    runner.validate(image)?;
    // Smoothing and linework both read the original, not each other.
    let smoothed = runner.apply(|| median_smooth(image, params.median_radius()))?;
    let linework = runner.apply(|| {
        invert(&edge_strength_alpha(&detect_edges(image, params.edge_intensity())))
    })?;
    let colored = runner.apply(|| {
        adjust_contrast_saturation(&smoothed, params.contrast_factor(), params.saturation_factor())
    })?;
    runner.try_apply(|| source_over_composite(&linework, &colored))
}

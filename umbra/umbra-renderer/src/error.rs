use thiserror::Error;

use umbra_scene::ProgramId;

use crate::assets::VertexKind;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid resolution {width}x{height}: both extents must be > 0")]
    InvalidResolution { width: u32, height: u32 },
    #[error("failed to build pipeline `{label}`: {message}")]
    Pipeline { label: String, message: String },
    #[error("no scene set")]
    NoScene,
    #[error("unknown program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("missing {kind} asset {handle}")]
    MissingAsset { kind: &'static str, handle: String },
    #[error("program {program:?} expects {expected:?} vertices but the mesh has {found:?}")]
    VertexKindMismatch { program: ProgramId, expected: VertexKind, found: VertexKind },
    #[error("texture `{name}`: {message}")]
    Texture { name: String, message: String },
    #[error("invalid frame plan: {0}")]
    FramePlan(String),
}

/// Runs `build` inside a validation error scope so shader compile and pipeline
/// link failures surface as [`RenderError::Pipeline`] instead of a device panic.
pub(crate) fn validated<T>(device: &wgpu::Device, label: &str, build: impl FnOnce() -> T) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(RenderError::Pipeline { label: label.to_string(), message: err.to_string() }),
    }
}

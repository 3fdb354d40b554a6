//! Render composition.
//!
//! Scene nodes describe what they want drawn through [`Render`]. The engine
//! flattens the result into a list of [`Instanced`] draws that feed both the
//! shadow pass and the lit main pass.

use crate::data_structures::model::Model;

/// Data for instanced object rendering: a model and its instance buffer.
///
/// The instance buffer carries per-instance transforms plus the
/// shadow-receiving flag.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    /// Whether this draw is also rendered into the shadow map.
    pub casts_shadow: bool,
}

/// Specifies how a scene object should be rendered.
///
/// - `None` renders nothing
/// - `Defaults(Vec<Instanced>)` renders a batch of opaque instanced objects
pub enum Render<'a> {
    None,
    Defaults(Vec<Instanced<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn into_instanced(self) -> Vec<Instanced<'a>> {
        match self {
            Render::None => Vec::new(),
            Render::Defaults(vec) => vec,
        }
    }
}

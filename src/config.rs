//! # Renderer Configuration
//!
//! Settings that shape the chunk renderer, loadable from JSON. Every field has a
//! default so a partial file (or `{}`) is a valid configuration.
//!
//! ## Key Components
//!
//! * `RendererConfig` - user-facing settings, validated once at startup
//! * `GpuCapabilities` - what the GPU binding layer reported, used to select a backend

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    engine_state::rendering::vertex::VertexFormatKind,
    error::{Error, Result},
};

/// Smallest render distance the renderer accepts, in chunks
pub const MIN_RENDER_DISTANCE: u32 = 2;
/// Largest render distance the renderer accepts, in chunks
pub const MAX_RENDER_DISTANCE: u32 = 32;

/// Fog-based chunk culling only pays off beyond this render distance
pub const FOG_CULLING_MIN_RENDER_DISTANCE: u32 = 4;

/// Settings for the chunk renderer.
///
/// # Examples
///
/// ```
/// use voxel_chunk_graph::config::RendererConfig;
///
/// let config = RendererConfig::from_json_str(r#"{ "render_distance": 12 }"#).unwrap();
/// assert_eq!(config.render_distance, 12);
/// assert!(config.use_chunk_culling);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Render distance in chunks, applied horizontally around the camera
    pub render_distance: u32,
    /// Number of mesh build workers; `None` picks one less than the available parallelism
    pub builder_threads: Option<usize>,
    /// Upper bound on build tasks submitted per frame
    pub max_builds_per_frame: usize,
    /// Occlusion and frustum culling during traversal
    pub use_chunk_culling: bool,
    /// Stop expanding the traversal past the fog distance
    pub use_fog_culling: bool,
    /// Whether fog is rendered at all
    pub enable_fog: bool,
    /// Pack many chunks into shared region buffers when the GPU allows it
    pub use_large_buffers: bool,
    /// Region dimensions in chunks; each must be a power of two
    pub region_size: [u32; 3],
    /// Vertex encoding used for chunk meshes
    pub vertex_format: VertexFormatKind,
    /// Cull entities whose bounds touch no visible chunk
    pub use_entity_culling: bool,
    /// Only tick animated sprites referenced by drawable chunks
    pub animate_only_visible_textures: bool,
    /// Camera travel in blocks that triggers a translucency re-sort
    pub translucency_resort_distance: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_distance: 8,
            builder_threads: None,
            max_builds_per_frame: 32,
            use_chunk_culling: true,
            use_fog_culling: true,
            enable_fog: true,
            use_large_buffers: true,
            region_size: [4, 4, 4],
            vertex_format: VertexFormatKind::Wide,
            use_entity_culling: true,
            animate_only_visible_textures: true,
            translucency_resort_distance: 1.0,
        }
    }
}

impl RendererConfig {
    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns `Error::Json` for malformed input and `Error::Config` when a value
    /// is out of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RendererConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks every value the renderer depends on.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_RENDER_DISTANCE..=MAX_RENDER_DISTANCE).contains(&self.render_distance) {
            return Err(Error::Config(format!(
                "render distance {} is outside {}..={}",
                self.render_distance, MIN_RENDER_DISTANCE, MAX_RENDER_DISTANCE
            )));
        }

        for dim in self.region_size {
            if dim == 0 || !dim.is_power_of_two() {
                return Err(Error::Config(format!(
                    "region size {:?} must be made of powers of two",
                    self.region_size
                )));
            }
        }

        if self.builder_threads == Some(0) {
            return Err(Error::Config("builder thread count must be at least 1".into()));
        }

        if self.max_builds_per_frame == 0 {
            return Err(Error::Config("max builds per frame must be at least 1".into()));
        }

        if !self.translucency_resort_distance.is_finite() || self.translucency_resort_distance < 0.0 {
            return Err(Error::Config(format!(
                "translucency re-sort distance {} must be a non-negative number",
                self.translucency_resort_distance
            )));
        }

        Ok(())
    }

    /// Number of workers to spawn for mesh builds.
    pub fn worker_count(&self) -> usize {
        self.builder_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
                .max(1)
        })
    }

    /// Fog culling needs GPU support, a large enough render distance and fog enabled.
    pub fn fog_culling_enabled(&self, capabilities: &GpuCapabilities) -> bool {
        capabilities.fog_distance
            && self.render_distance > FOG_CULLING_MIN_RENDER_DISTANCE
            && self.enable_fog
            && self.use_fog_culling
    }
}

/// Features reported by the GPU binding layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuCapabilities {
    /// Buffers large enough to hold a whole region of chunk meshes
    pub large_buffers: bool,
    /// Half-precision float vertex attributes
    pub half_float_vertices: bool,
    /// Distance-based fog that hides geometry past the render distance
    pub fog_distance: bool,
}

impl GpuCapabilities {
    /// Capabilities of every device wgpu can create.
    pub fn all() -> Self {
        Self {
            large_buffers: true,
            half_float_vertices: true,
            fog_distance: true,
        }
    }

    /// Rejects configurations that ask for something this GPU cannot do.
    pub fn check(&self, config: &RendererConfig) -> Result<()> {
        if config.vertex_format == VertexFormatKind::Compact && !self.half_float_vertices {
            return Err(Error::UnsupportedFeature(
                "compact vertex format requires half-float vertex attributes".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            RendererConfig::from_json_str(r#"{ "render_distance": 6, "vertex_format": "compact" }"#)
                .unwrap();
        assert_eq!(config.render_distance, 6);
        assert_eq!(config.vertex_format, VertexFormatKind::Compact);
        assert_eq!(config.region_size, [4, 4, 4]);
    }

    #[test]
    fn test_region_size_must_be_power_of_two() {
        let result = RendererConfig::from_json_str(r#"{ "region_size": [4, 3, 4] }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_render_distance_bounds() {
        let config = RendererConfig {
            render_distance: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RendererConfig::from_json_str("{ render_distance"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_fog_culling_conditions() {
        let config = RendererConfig::default();
        assert!(!config.fog_culling_enabled(&GpuCapabilities::default()));
        assert!(config.fog_culling_enabled(&GpuCapabilities::all()));

        let short = RendererConfig {
            render_distance: 4,
            ..Default::default()
        };
        assert!(!short.fog_culling_enabled(&GpuCapabilities::all()));
    }

    #[test]
    fn test_compact_format_requires_half_floats() {
        let config = RendererConfig {
            vertex_format: VertexFormatKind::Compact,
            ..Default::default()
        };
        assert!(matches!(
            GpuCapabilities::default().check(&config),
            Err(Error::UnsupportedFeature(_))
        ));
        assert!(GpuCapabilities::all().check(&config).is_ok());
    }
}

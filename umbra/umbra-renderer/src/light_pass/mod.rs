//! Light pass: fullscreen deferred shading into the lit-color and bright targets.

use glam::{Mat4, Vec3};
use wgpu::CommandEncoder;

use umbra_scene::{Attenuation, PointLight, Scene, MAX_POINT_LIGHTS};

use crate::error::{validated, RenderError};
use crate::resources::{FrameResources, ShadowMaps, HDR_FORMAT};
use crate::shadows::{light_space_matrix, OMNI_SHADOW_FAR};

const FULLSCREEN_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/fullscreen.wgsl"));
const LIGHTING_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/lighting.wgsl"));

/// Rec. 709 luma weights used for the bright split.
pub const LUMINANCE_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// CPU version of the lighting shader's bright output: the lit color when its
/// luminance is strictly above `threshold`, black otherwise.
pub fn bright_contribution(color: Vec3, threshold: f32) -> Vec3 {
    if color.dot(LUMINANCE_WEIGHTS) > threshold {
        color
    } else {
        Vec3::ZERO
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightSlot {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    _pad: [f32; 2],
}

impl PointLightSlot {
    /// Placeholder for empty slots: black, zero radius, unit attenuation, so its
    /// contribution is exactly zero.
    pub const DUMMY: PointLightSlot = PointLightSlot {
        position: [0.0; 3],
        radius: 0.0,
        color: [0.0; 3],
        constant: Attenuation::UNUSED.constant,
        linear: Attenuation::UNUSED.linear,
        quadratic: Attenuation::UNUSED.quadratic,
        _pad: [0.0; 2],
    };

    pub fn from_light(light: &PointLight) -> Self {
        let att = light.attenuation();
        Self {
            position: light.position().to_array(),
            radius: light.radius(),
            color: light.color().to_array(),
            constant: att.constant,
            linear: att.linear,
            quadratic: att.quadratic,
            _pad: [0.0; 2],
        }
    }

    /// CPU mirror of the shader's point-light term scale: attenuation inside the
    /// radius, zero outside.
    pub fn contribution_scale(&self, world_pos: Vec3) -> f32 {
        let dist = Vec3::from_array(self.position).distance(world_pos);
        if dist >= self.radius {
            return 0.0;
        }
        let color_max = Vec3::from_array(self.color).max_element();
        color_max / (self.constant + self.linear * dist + self.quadratic * dist * dist)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub dir_direction: [f32; 4],
    pub dir_color: [f32; 4],
    pub light_space: [f32; 16],
    /// xyz = shadow-casting point light, w = omni far plane.
    pub shadow_light: [f32; 4],
    pub points: [PointLightSlot; MAX_POINT_LIGHTS],
}

impl LightingUniform {
    /// Packs the scene's lights. Without a directional light its color is zero.
    pub fn from_scene(scene: &Scene) -> Self {
        let (dir_direction, dir_color, light_space) = match scene.dir_light() {
            Some(light) => (light.direction(), light.color(), light_space_matrix(light.direction())),
            None => (Vec3::Y, Vec3::ZERO, Mat4::IDENTITY),
        };
        let mut points = [PointLightSlot::DUMMY; MAX_POINT_LIGHTS];
        for (slot, light) in points.iter_mut().zip(scene.point_lights()) {
            *slot = PointLightSlot::from_light(light);
        }
        let shadow_light = scene.point_lights().first().map(PointLight::position).unwrap_or(Vec3::ZERO);
        Self {
            dir_direction: dir_direction.extend(0.0).to_array(),
            dir_color: dir_color.extend(1.0).to_array(),
            light_space: light_space.to_cols_array(),
            shadow_light: shadow_light.extend(OMNI_SHADOW_FAR).to_array(),
            points,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub camera_pos: [f32; 4],
    pub params: [f32; 4],
    pub flags: [u32; 4],
}

impl FrameUniform {
    pub fn new(camera_pos: Vec3, bright_threshold: f32, dir_shadows: bool, omni_shadows: bool) -> Self {
        Self {
            camera_pos: camera_pos.extend(1.0).to_array(),
            params: [bright_threshold, 0.0, 0.0, 0.0],
            flags: [u32::from(dir_shadows), u32::from(omni_shadows), 0, 0],
        }
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture { sample_type, view_dimension, multisampled: false },
        count: None,
    }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(size),
        },
        count: None,
    }
}

pub struct LightPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
    lights_buf: wgpu::Buffer,
    frame_buf: wgpu::Buffer,
}

impl LightPass {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let unfilterable = wgpu::TextureSampleType::Float { filterable: false };
        let d2 = wgpu::TextureViewDimension::D2;
        let lights_size = std::mem::size_of::<LightingUniform>() as u64;
        let frame_size = std::mem::size_of::<FrameUniform>() as u64;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light_pass_bind_group_layout"),
            entries: &[
                texture_entry(0, unfilterable, d2),
                texture_entry(1, unfilterable, d2),
                texture_entry(2, unfilterable, d2),
                texture_entry(3, wgpu::TextureSampleType::Depth, d2),
                texture_entry(4, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::Cube),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                uniform_entry(6, lights_size),
                uniform_entry(7, frame_size),
            ],
        });
        let pipeline = validated(device, "light_pass_pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("lighting_shader"),
                source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN_WGSL}\n{LIGHTING_WGSL}").into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("light_pass_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("light_pass_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(HDR_FORMAT.into()), Some(HDR_FORMAT.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_cube_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let lights_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting_uniform"),
            size: lights_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting_frame_uniform"),
            size: frame_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self { pipeline, bind_group_layout, shadow_sampler, lights_buf, frame_buf })
    }

    pub fn write_lights(&self, queue: &wgpu::Queue, lights: &LightingUniform) {
        queue.write_buffer(&self.lights_buf, 0, bytemuck::bytes_of(lights));
    }

    pub fn write_frame(&self, queue: &wgpu::Queue, frame: &FrameUniform) {
        queue.write_buffer(&self.frame_buf, 0, bytemuck::bytes_of(frame));
    }

    pub fn encode(&self, encoder: &mut CommandEncoder, device: &wgpu::Device, frame: &FrameResources, shadows: &ShadowMaps) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("light_pass_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&frame.position_view()) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&frame.normal_view()) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&frame.albedo_spec_view()) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(&shadows.directional_view()) },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::TextureView(&shadows.cube_view()) },
                wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::Sampler(&self.shadow_sampler) },
                wgpu::BindGroupEntry { binding: 6, resource: self.lights_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 7, resource: self.frame_buf.as_entire_binding() },
            ],
        });
        let color_view = frame.lit_color_view();
        let bright_view = frame.bright_view();
        let clear = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
            })
        };
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("light_pass"),
            color_attachments: &[clear(&color_view), clear(&bright_view)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_scene::DirLight;

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<PointLightSlot>(), 48);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 352);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 48);
    }

    #[test]
    fn empty_slots_carry_dummy_lights() {
        for n in 0..=MAX_POINT_LIGHTS {
            let mut scene = Scene::new();
            for i in 0..n {
                assert!(scene.add_point_light(PointLight::new(Vec3::new(i as f32, 1.0, 0.0), Vec3::splat(2.0))));
            }
            let packed = LightingUniform::from_scene(&scene);
            for (i, slot) in packed.points.iter().enumerate() {
                if i < n {
                    assert_eq!(*slot, PointLightSlot::from_light(&scene.point_lights()[i]));
                } else {
                    assert_eq!(*slot, PointLightSlot::DUMMY);
                    for p in [Vec3::ZERO, Vec3::ONE, Vec3::splat(-40.0)] {
                        assert_eq!(slot.contribution_scale(p), 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn missing_directional_light_is_black() {
        let packed = LightingUniform::from_scene(&Scene::new());
        assert_eq!(&packed.dir_color[..3], &[0.0, 0.0, 0.0]);
        let mut scene = Scene::new();
        scene.set_dir_light(DirLight::new(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5)));
        let packed = LightingUniform::from_scene(&scene);
        assert_eq!(packed.dir_direction, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(packed.light_space, light_space_matrix(Vec3::Y).to_cols_array());
    }

    #[test]
    fn bright_split_keeps_only_pixels_above_threshold() {
        let threshold = 1.0;
        let below = Vec3::splat(0.5);
        let at = Vec3::ONE;
        let above = Vec3::new(3.0, 2.0, 1.5);
        assert_eq!(bright_contribution(below, threshold), Vec3::ZERO);
        assert_eq!(bright_contribution(above, threshold), above);
        // White has luminance 1 up to rounding; nudge around it for a strict check.
        assert_eq!(bright_contribution(at * 0.999, threshold), Vec3::ZERO);
        assert_eq!(bright_contribution(at * 1.001, threshold), at * 1.001);
        assert_eq!(bright_contribution(Vec3::ZERO, 0.0), Vec3::ZERO);
        // Exactly at the threshold is not bright.
        assert_eq!(bright_contribution(Vec3::Z, LUMINANCE_WEIGHTS.z), Vec3::ZERO);
    }

    #[test]
    fn bright_split_weights_green_over_blue() {
        let green = Vec3::new(0.0, 1.2, 0.0);
        let blue = Vec3::new(0.0, 0.0, 1.2);
        assert_eq!(bright_contribution(green, 0.5), green);
        assert_eq!(bright_contribution(blue, 0.5), Vec3::ZERO);
    }

    #[test]
    fn frame_uniform_carries_threshold() {
        let frame = FrameUniform::new(Vec3::new(1.0, 2.0, 3.0), 0.75, true, false);
        assert_eq!(frame.params[0], 0.75);
        assert_eq!(frame.flags, [1, 0, 0, 0]);
        assert_eq!(frame.camera_pos, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn point_light_fades_to_zero_at_radius() {
        let light = PointLight::new(Vec3::ZERO, Vec3::ONE);
        let slot = PointLightSlot::from_light(&light);
        assert!(slot.contribution_scale(Vec3::new(1.0, 0.0, 0.0)) > 0.0);
        assert_eq!(slot.contribution_scale(Vec3::new(light.radius() + 0.01, 0.0, 0.0)), 0.0);
    }
}

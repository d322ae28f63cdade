//! Umbra Renderer: wgpu deferred pipeline. Per frame: directional shadow, omni
//! shadow, G-buffer, deferred Blinn-Phong lighting, bloom blur, HDR tone map.

pub mod assets;
pub mod bloom;
pub mod config;
pub mod draw;
pub mod error;
pub mod gbuffer;
pub mod graph;
pub mod light_pass;
pub mod markers;
pub mod particles;
pub mod present;
pub mod program;
pub mod resources;
pub mod shadows;

use log::debug;
use umbra_scene::{MovingCamera, ProgramId, Scene};

pub use assets::{GpuAssets, GpuMesh, GpuTexture, VertexKind};
pub use bloom::{blur_schedule, BloomSource, BlurPass, BlurStep};
pub use config::{RendererConfig, BLUR_AMOUNT_RANGE, EXPOSURE_RANGE, GAMMA_RANGE};
pub use error::RenderError;
pub use gbuffer::GeometryPass;
pub use graph::{FramePlan, PassKind, PlannedPass, ResourceId, ResourceUsage};
pub use light_pass::{bright_contribution, FrameUniform, LightPass, LightingUniform, PointLightSlot, LUMINANCE_WEIGHTS};
pub use present::{tone_map, ToneMapPass};
pub use program::{GeometryProgram, ProgramDesc, GBUFFER_WGSL, OBJECT_WGSL};
pub use resources::{FrameResources, Resolution, ShadowMaps};
pub use shadows::{cube_face_matrices, light_space_matrix, DirectionalShadowPass, OmniShadowPass};

use draw::prepare_draws;
use program::GeometryShared;

/// Program registered first by [`Renderer::new`]: static meshes.
pub const STATIC_PROGRAM: ProgramId = ProgramId(0);
/// Program registered second by [`Renderer::new`]: skinned meshes.
pub const SKINNED_PROGRAM: ProgramId = ProgramId(1);

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RendererConfig,
    shared: GeometryShared,
    programs: Vec<GeometryProgram>,
    dir_shadow: DirectionalShadowPass,
    omni_shadow: OmniShadowPass,
    geometry: GeometryPass,
    light_pass: LightPass,
    blur: BlurPass,
    tonemap: ToneMapPass,
    shadow_maps: ShadowMaps,
    frame_resources: Option<FrameResources>,
    resolution: Resolution,
    scene: Option<Scene>,
    camera_stale: bool,
    lights_stale: bool,
    last_plan: Option<FramePlan>,
}

impl Renderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, resolution: Resolution) -> Result<Self, RenderError> {
        Self::new_with_config(device, queue, resolution, RendererConfig::default())
    }

    pub fn new_with_config(
        device: wgpu::Device,
        queue: wgpu::Queue,
        resolution: Resolution,
        config: RendererConfig,
    ) -> Result<Self, RenderError> {
        let shared = GeometryShared::new(&device, &queue)?;
        let programs = vec![
            GeometryProgram::new(&device, &shared, &ProgramDesc::static_mesh())?,
            GeometryProgram::new(&device, &shared, &ProgramDesc::skinned_mesh())?,
        ];
        let dir_shadow = DirectionalShadowPass::new(&device, &shared)?;
        let omni_shadow = OmniShadowPass::new(&device, &shared)?;
        let geometry = GeometryPass::new(&device, &queue, &shared)?;
        let light_pass = LightPass::new(&device)?;
        let blur = BlurPass::new(&device, &queue)?;
        let tonemap = ToneMapPass::new(&device, config.output_format)?;
        let shadow_maps = ShadowMaps::new(&device, config.shadow_resolution);
        let frame_resources = Some(FrameResources::ensure_size(&device, None, resolution));
        debug!(
            "renderer ready at {}x{}, shadow maps {}px, output {:?}",
            resolution.width(),
            resolution.height(),
            shadow_maps.size(),
            config.output_format
        );
        Ok(Self {
            device,
            queue,
            config,
            shared,
            programs,
            dir_shadow,
            omni_shadow,
            geometry,
            light_pass,
            blur,
            tonemap,
            shadow_maps,
            frame_resources,
            resolution,
            scene: None,
            camera_stale: true,
            lights_stale: false,
            last_plan: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }
    pub fn config(&self) -> &RendererConfig { &self.config }
    pub fn resolution(&self) -> Resolution { self.resolution }

    /// Compiles a geometry program and returns its id. Ids are dense and stable.
    pub fn add_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, RenderError> {
        let program = GeometryProgram::new(&self.device, &self.shared, desc)?;
        let id = ProgramId(self.programs.len());
        self.programs.push(program);
        if let Some(scene) = self.scene.as_mut() {
            scene.reserve_programs(self.programs.len());
        }
        self.camera_stale = true;
        debug!("registered program `{}` as {:?}", desc.label, id);
        Ok(id)
    }

    pub fn program(&self, id: ProgramId) -> Option<&GeometryProgram> {
        self.programs.get(id.0)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Makes `scene` active and pushes its lights. Returns the previous scene.
    pub fn set_scene(&mut self, mut scene: Scene) -> Option<Scene> {
        scene.reserve_programs(self.programs.len());
        let previous = self.scene.replace(scene);
        self.update_lighting_uniforms();
        previous
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Light edits made through this borrow are pushed on the next draw.
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.lights_stale = true;
        self.scene.as_mut()
    }

    pub fn take_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    /// Advances the active scene's camera path and particles. No GPU work.
    pub fn update(&mut self, dt: f32, camera: &mut MovingCamera) {
        if let Some(scene) = self.scene.as_mut() {
            scene.update(dt, camera);
        }
    }

    /// Pushes directional and point lights, the light-space matrix and the cube
    /// face matrices of the active scene.
    pub fn update_lighting_uniforms(&mut self) {
        self.lights_stale = false;
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        self.light_pass.write_lights(&self.queue, &LightingUniform::from_scene(scene));
        if let Some(light) = scene.dir_light() {
            self.dir_shadow.write_light_space(&self.queue, light_space_matrix(light.direction()));
        }
        if let Some(light) = scene.point_lights().first() {
            self.omni_shadow.write_faces(&self.queue, light.position());
        }
    }

    /// Writes projection·view to every program.
    pub fn update_cam_uniforms(&mut self, camera: &MovingCamera) {
        let view_proj = camera.view_projection();
        for program in &self.programs {
            program.write_camera(&self.queue, view_proj);
        }
        self.camera_stale = false;
    }

    pub fn update_cam_uniforms_for(&self, id: ProgramId, camera: &MovingCamera) -> Result<(), RenderError> {
        let program = self.programs.get(id.0).ok_or(RenderError::UnknownProgram(id))?;
        program.write_camera(&self.queue, camera.view_projection());
        Ok(())
    }

    /// Refreshes the camera matrices and pushes them when they changed or a
    /// program was added since the last push. Returns whether anything was written.
    pub fn sync_camera(&mut self, camera: &mut MovingCamera) -> bool {
        if camera.update_if_changed() || self.camera_stale {
            self.update_cam_uniforms(camera);
            return true;
        }
        false
    }

    /// Rebuilds every viewport-sized target together. Shadow maps are unaffected.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        let existing = self.frame_resources.take();
        self.frame_resources = Some(FrameResources::ensure_size(&self.device, existing, resolution));
        self.resolution = resolution;
    }

    pub fn exposure(&self) -> f32 { self.config.exposure }
    pub fn set_exposure(&mut self, exposure: f32) { self.config.exposure = exposure; }
    pub fn gamma(&self) -> f32 { self.config.gamma }
    pub fn set_gamma(&mut self, gamma: f32) { self.config.gamma = gamma; }
    pub fn blur_amount(&self) -> u32 { self.config.blur_amount }
    pub fn set_blur_amount(&mut self, amount: u32) { self.config.blur_amount = amount; }
    pub fn bright_threshold(&self) -> f32 { self.config.bright_threshold }
    pub fn set_bright_threshold(&mut self, threshold: f32) { self.config.bright_threshold = threshold; }
    pub fn camera_control_points_shown(&self) -> bool { self.config.show_camera_control_points }
    pub fn show_camera_control_points(&mut self, show: bool) { self.config.show_camera_control_points = show; }

    /// Pass plan executed by the most recent successful draw.
    pub fn last_frame_plan(&self) -> Option<&FramePlan> {
        self.last_plan.as_ref()
    }

    /// Renders one frame into `target` and submits it. Camera uniforms must have
    /// been pushed (see [`Renderer::sync_camera`]).
    pub fn draw(&mut self, assets: &GpuAssets, camera: &MovingCamera, target: &wgpu::TextureView) -> Result<(), RenderError> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("umbra_frame") });
        self.encode_frame(&mut encoder, assets, camera, target)?;
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Encodes the full pass sequence into `encoder`. Nothing is encoded when an
    /// error is returned.
    pub fn encode_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        assets: &GpuAssets,
        camera: &MovingCamera,
        target: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        if self.lights_stale {
            self.update_lighting_uniforms();
        }
        let scene = self.scene.as_ref().ok_or(RenderError::NoScene)?;
        let plan = FramePlan::for_scene(scene, self.config.blur_amount);
        plan.validate()?;
        let marker_program = self.programs.get(STATIC_PROGRAM.0).ok_or(RenderError::UnknownProgram(STATIC_PROGRAM))?;
        let draws = prepare_draws(&self.device, &self.queue, &self.shared, &self.programs, scene, assets)?;

        let existing = self.frame_resources.take();
        let frame = self.frame_resources.insert(FrameResources::ensure_size(&self.device, existing, self.resolution));

        let dir_shadows = plan.contains(PassKind::DirectionalShadow);
        let omni_shadows = plan.contains(PassKind::OmniShadow);
        if dir_shadows {
            self.dir_shadow.encode(encoder, &self.shadow_maps, &draws);
        }
        if omni_shadows {
            self.omni_shadow.encode(encoder, &self.shadow_maps, &draws);
        }

        self.geometry.prepare(
            &self.device,
            &self.queue,
            &self.shared,
            scene,
            camera.view_projection(),
            self.config.show_camera_control_points,
        );
        self.geometry.encode(encoder, frame, &self.programs, &draws, marker_program);

        let frame_uniform = FrameUniform::new(camera.position(), self.config.bright_threshold, dir_shadows, omni_shadows);
        self.light_pass.write_frame(&self.queue, &frame_uniform);
        self.light_pass.encode(encoder, &self.device, frame, &self.shadow_maps);

        let bloom = self.blur.encode(encoder, &self.device, frame, self.config.blur_amount);
        debug_assert_eq!(bloom, plan.bloom_source());

        self.tonemap.write_params(&self.queue, self.config.exposure, self.config.gamma);
        self.tonemap.encode(encoder, &self.device, frame, bloom, target);

        self.last_plan = Some(plan);
        Ok(())
    }
}

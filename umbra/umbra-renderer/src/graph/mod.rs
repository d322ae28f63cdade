//! Frame plan: the ordered pass list for one frame plus the resources each pass
//! reads and writes. Built from the scene before encoding so skipped passes and
//! the bloom result index are decided in one place.

use umbra_scene::Scene;

use crate::bloom::{blur_schedule, BloomSource};
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    DirectionalShadow,
    CubeShadow,
    GBuffer,
    LitColor,
    Bright,
    PingPong(usize),
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    DirectionalShadow,
    OmniShadow,
    Geometry,
    Lighting,
    Blur { horizontal: bool },
    ToneMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPass {
    pub kind: PassKind,
    pub resources: Vec<(ResourceId, ResourceUsage)>,
}

impl PlannedPass {
    fn new(kind: PassKind, resources: Vec<(ResourceId, ResourceUsage)>) -> Self {
        Self { kind, resources }
    }

    pub fn reads(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().filter(|(_, u)| *u == ResourceUsage::Read).map(|(id, _)| *id)
    }

    pub fn writes(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().filter(|(_, u)| *u == ResourceUsage::Write).map(|(id, _)| *id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    passes: Vec<PlannedPass>,
    bloom: BloomSource,
}

fn bloom_resource(source: BloomSource) -> ResourceId {
    match source {
        BloomSource::Bright => ResourceId::Bright,
        BloomSource::PingPong(index) => ResourceId::PingPong(index),
    }
}

impl FramePlan {
    /// Directional shadows run only with a directional light; omni shadows only
    /// when there is something to cast them and a point light to cast from.
    pub fn for_scene(scene: &Scene, blur_amount: u32) -> Self {
        use ResourceUsage::{Read, Write};
        let mut passes = Vec::new();
        let dir_shadows = scene.dir_light().is_some();
        let omni_shadows = scene.has_render_objects() && !scene.point_lights().is_empty();
        if dir_shadows {
            passes.push(PlannedPass::new(PassKind::DirectionalShadow, vec![(ResourceId::DirectionalShadow, Write)]));
        }
        if omni_shadows {
            passes.push(PlannedPass::new(PassKind::OmniShadow, vec![(ResourceId::CubeShadow, Write)]));
        }
        passes.push(PlannedPass::new(PassKind::Geometry, vec![(ResourceId::GBuffer, Write)]));
        let mut lighting = vec![(ResourceId::GBuffer, Read)];
        if dir_shadows {
            lighting.push((ResourceId::DirectionalShadow, Read));
        }
        if omni_shadows {
            lighting.push((ResourceId::CubeShadow, Read));
        }
        lighting.extend([(ResourceId::LitColor, Write), (ResourceId::Bright, Write)]);
        passes.push(PlannedPass::new(PassKind::Lighting, lighting));

        let mut bloom = BloomSource::Bright;
        for step in blur_schedule(blur_amount) {
            passes.push(PlannedPass::new(
                PassKind::Blur { horizontal: step.horizontal },
                vec![(bloom_resource(step.read), Read), (ResourceId::PingPong(step.write), Write)],
            ));
            bloom = BloomSource::PingPong(step.write);
        }
        passes.push(PlannedPass::new(
            PassKind::ToneMap,
            vec![(ResourceId::LitColor, Read), (bloom_resource(bloom), Read), (ResourceId::Output, Write)],
        ));
        Self { passes, bloom }
    }

    pub fn passes(&self) -> &[PlannedPass] {
        &self.passes
    }

    pub fn kinds(&self) -> impl Iterator<Item = PassKind> + '_ {
        self.passes.iter().map(|p| p.kind)
    }

    pub fn contains(&self, kind: PassKind) -> bool {
        self.kinds().any(|k| k == kind)
    }

    pub fn bloom_source(&self) -> BloomSource {
        self.bloom
    }

    pub fn blur_passes(&self) -> usize {
        self.kinds().filter(|k| matches!(k, PassKind::Blur { .. })).count()
    }

    /// Every read must follow a write of the same resource earlier in the frame,
    /// and no pass may read what it writes.
    pub fn validate(&self) -> Result<(), RenderError> {
        let mut produced: Vec<ResourceId> = Vec::new();
        for pass in &self.passes {
            for read in pass.reads() {
                if pass.writes().any(|w| w == read) {
                    return Err(RenderError::FramePlan(format!("{:?} reads and writes {read:?}", pass.kind)));
                }
                if !produced.contains(&read) {
                    return Err(RenderError::FramePlan(format!("{:?} reads {read:?} before it is written", pass.kind)));
                }
            }
            produced.extend(pass.writes());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_scene::glam::Vec3;
    use umbra_scene::{DirLight, PointLight, ProgramId, RenderObject};

    fn lit_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_dir_light(DirLight::new(Vec3::ONE, Vec3::ONE));
        scene.add_point_light(PointLight::new(Vec3::Y, Vec3::ONE));
        scene.add_render_object(ProgramId(0), RenderObject::new());
        scene
    }

    #[test]
    fn full_scene_runs_every_pass_in_order() {
        let plan = FramePlan::for_scene(&lit_scene(), 2);
        let kinds: Vec<_> = plan.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                PassKind::DirectionalShadow,
                PassKind::OmniShadow,
                PassKind::Geometry,
                PassKind::Lighting,
                PassKind::Blur { horizontal: true },
                PassKind::Blur { horizontal: false },
                PassKind::ToneMap,
            ]
        );
        assert_eq!(plan.bloom_source(), BloomSource::PingPong(0));
        plan.validate().unwrap();
    }

    #[test]
    fn empty_scene_skips_shadow_passes() {
        let plan = FramePlan::for_scene(&Scene::new(), 10);
        assert!(!plan.contains(PassKind::DirectionalShadow));
        assert!(!plan.contains(PassKind::OmniShadow));
        assert_eq!(plan.blur_passes(), 10);
        plan.validate().unwrap();
    }

    #[test]
    fn omni_pass_needs_objects() {
        let mut scene = Scene::new();
        scene.add_point_light(PointLight::new(Vec3::Y, Vec3::ONE));
        assert!(!FramePlan::for_scene(&scene, 2).contains(PassKind::OmniShadow));
        scene.add_render_object(ProgramId(0), RenderObject::new());
        assert!(FramePlan::for_scene(&scene, 2).contains(PassKind::OmniShadow));
    }

    #[test]
    fn zero_blur_tone_maps_the_bright_buffer() {
        let plan = FramePlan::for_scene(&lit_scene(), 0);
        assert_eq!(plan.blur_passes(), 0);
        assert_eq!(plan.bloom_source(), BloomSource::Bright);
        let tone_map = plan.passes().last().unwrap();
        assert!(tone_map.reads().any(|r| r == ResourceId::Bright));
        plan.validate().unwrap();
    }

    #[test]
    fn validate_rejects_reads_before_writes() {
        let plan = FramePlan {
            passes: vec![
                PlannedPass::new(PassKind::Lighting, vec![(ResourceId::GBuffer, ResourceUsage::Read)]),
                PlannedPass::new(PassKind::Geometry, vec![(ResourceId::GBuffer, ResourceUsage::Write)]),
            ],
            bloom: BloomSource::Bright,
        };
        assert!(matches!(plan.validate(), Err(RenderError::FramePlan(_))));
    }
}

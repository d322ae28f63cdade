//! Minimal wgpu init (no window). Verifies umbra-renderer builds every pipeline.
//! Run: cargo run -p debug --bin minimal_wgpu

use umbra_renderer::{Renderer, Resolution};

fn main() -> Result<(), String> {
    debug::init_logging();
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or("No adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| e.to_string())?;
        let resolution = Resolution::new(800, 600).map_err(|e| e.to_string())?;
        let renderer = Renderer::new(device, queue, resolution).map_err(|e| e.to_string())?;
        println!("Umbra minimal_wgpu: OK ({} programs)", renderer.program_count());
        Ok(())
    })
}

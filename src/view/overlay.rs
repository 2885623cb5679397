use crate::controller::Frame;
use crate::ui::{self, OverlayInput};

/// Tessellated panel waiting to be painted over the model pass
pub struct PanelOutput {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen: egui_wgpu::ScreenDescriptor,
}

/// egui debug panel drawn on top of the scene
pub struct DebugOverlay {
    ctx: egui::Context,
    renderer: egui_wgpu::Renderer,
    input: Box<dyn OverlayInput>,
}

impl DebugOverlay {
    pub fn new(
        ctx: egui::Context,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        input: Box<dyn OverlayInput>,
    ) -> Self {
        let renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());
        Self { ctx, renderer, input }
    }

    /// Run the panel against this frame's scene and camera
    pub fn run(&mut self, frame: &mut Frame<'_>) -> PanelOutput {
        let pixels_per_point = frame.viewport.pixel_ratio as f32;
        let raw_input = self.input.take_input(&frame.viewport);
        self.ctx.set_pixels_per_point(pixels_per_point);
        let mut full_output = self.ctx.run(raw_input, |ctx| ui::build_panel(ctx, &mut *frame));
        self.input.handle_output(std::mem::take(&mut full_output.platform_output));

        let primitives = self.ctx.tessellate(std::mem::take(&mut full_output.shapes), pixels_per_point);
        PanelOutput {
            primitives,
            textures_delta: full_output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [frame.viewport.width, frame.viewport.height],
                pixels_per_point,
            },
        }
    }

    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        panel: PanelOutput,
    ) {
        for (id, image_delta) in &panel.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &panel.primitives, &panel.screen);

        {
            let egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut egui_pass.forget_lifetime(), &panel.primitives, &panel.screen);
        }

        for id in &panel.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

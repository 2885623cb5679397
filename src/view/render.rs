use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::controller::{DrawTarget, Frame};
use crate::model::{Camera, MeshBuffer, NodeId, Scene, SceneNode, Vertex};
use crate::view::overlay::DebugOverlay;
use crate::view::GpuContext;

pub const MAX_LIGHTS: usize = 4;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Ambient radiance per unit of environment intensity
const AMBIENT_PER_ENV: [f32; 3] = [0.045, 0.048, 0.052];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 4],
    pub radiance: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingUniform {
    pub lights: [LightUniform; MAX_LIGHTS],
    pub ambient: [f32; 4],
    pub exposure: f32,
    pub light_count: u32,
    pub _pad: [f32; 2],
}

impl LightingUniform {
    /// Lights beyond [`MAX_LIGHTS`] are not shaded
    pub fn from_scene(scene: &Scene) -> Self {
        let mut lights = [LightUniform::default(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().zip(&scene.lights) {
            let [r, g, b] = light.color;
            slot.direction = light.to_light().extend(0.0).to_array();
            slot.radiance = [r * light.intensity, g * light.intensity, b * light.intensity, 1.0];
        }
        let [ar, ag, ab] = AMBIENT_PER_ENV.map(|c| c * scene.env_intensity);
        Self {
            lights,
            ambient: [ar, ag, ab, 1.0],
            exposure: scene.exposure,
            light_count: scene.lights.len().min(MAX_LIGHTS) as u32,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ModelUniform {
    pub fn from_node(node: &SceneNode) -> Self {
        let model = node.transform.matrix();
        let [r, g, b] = node.color;
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
            color: [r, g, b, 1.0],
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_model_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
    node_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("model_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/model.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("model_pipeline_layout"),
        bind_group_layouts: &[frame_layout, node_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("model_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // STL winding is not reliable
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// GPU side of one scene node
struct NodeResources {
    mesh: MeshBuffer,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// wgpu implementation of the draw primitive, shared by the web and native entry points
pub struct Renderer {
    gpu: GpuContext,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    node_layout: wgpu::BindGroupLayout,
    nodes: HashMap<NodeId, NodeResources>,
    overlay: Option<DebugOverlay>,
}

impl Renderer {
    pub fn new(gpu: GpuContext) -> Self {
        let device = gpu.device.as_ref();
        let camera_buffer = uniform_buffer(device, "camera_buffer", std::mem::size_of::<CameraUniform>());
        let lighting_buffer = uniform_buffer(device, "lighting_buffer", std::mem::size_of::<LightingUniform>());

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                uniform_layout_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_layout_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("node_bind_group_layout"),
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
            ],
        });

        let pipeline = create_model_pipeline(device, gpu.format, &frame_layout, &node_layout);
        let depth_view = create_depth_texture(device, gpu.config.width, gpu.config.height);

        Self {
            gpu,
            depth_view,
            pipeline,
            camera_buffer,
            lighting_buffer,
            frame_bind_group,
            node_layout,
            nodes: HashMap::new(),
            overlay: None,
        }
    }

    pub fn with_overlay(mut self, overlay: DebugOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Reconfigure surface and depth buffer when the drawable size changed
    fn sync_size(&mut self, width: u32, height: u32) {
        if self.gpu.resize(width, height) {
            self.depth_view = create_depth_texture(&self.gpu.device, width, height);
            tracing::debug!(width, height, "surface reconfigured");
        }
    }

    /// Upload meshes of nodes the GPU has not seen yet and refresh every node transform
    fn sync_nodes(&mut self, scene: &Scene) {
        for (id, node) in scene.nodes() {
            if node.mesh.is_empty() {
                continue;
            }
            let resources = self.nodes.entry(id).or_insert_with(|| {
                let device = self.gpu.device.as_ref();
                let uniform = uniform_buffer(device, "node_buffer", std::mem::size_of::<ModelUniform>());
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("node_bind_group"),
                    layout: &self.node_layout,
                    entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() }],
                });
                tracing::debug!(?id, vertices = node.mesh.vertices.len(), "mesh uploaded");
                NodeResources { mesh: node.mesh.upload(device), uniform, bind_group }
            });
            self.gpu
                .queue
                .write_buffer(&resources.uniform, 0, bytemuck::bytes_of(&ModelUniform::from_node(node)));
        }
    }

    fn acquire(&self) -> Option<wgpu::SurfaceTexture> {
        match self.gpu.surface.get_current_texture() {
            Ok(texture) => Some(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                None
            }
            Err(wgpu::SurfaceError::Timeout) => None,
            Err(e) => {
                tracing::error!(error = ?e, "failed to acquire frame");
                None
            }
        }
    }
}

impl DrawTarget for Renderer {
    fn draw(&mut self, mut frame: Frame<'_>) {
        // The panel edits presentation values before they are uploaded
        let panel = self.overlay.as_mut().map(|overlay| overlay.run(&mut frame));

        self.sync_size(frame.viewport.width, frame.viewport.height);
        let queue = self.gpu.queue.clone();
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&CameraUniform::from_camera(frame.camera)));
        queue.write_buffer(&self.lighting_buffer, 0, bytemuck::bytes_of(&LightingUniform::from_scene(frame.scene)));
        self.sync_nodes(frame.scene);

        let Some(surface_texture) = self.acquire() else {
            return;
        };
        let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let device = self.gpu.device.clone();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame_encoder") });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("model_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Page background shows through
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for resources in self.nodes.values() {
                pass.set_bind_group(1, &resources.bind_group, &[]);
                pass.set_vertex_buffer(0, resources.mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(resources.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..resources.mesh.index_count, 0, 0..1);
            }
        }

        if let (Some(overlay), Some(panel)) = (self.overlay.as_mut(), panel) {
            overlay.paint(&device, &queue, &mut encoder, &view, panel);
        }

        queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }
}

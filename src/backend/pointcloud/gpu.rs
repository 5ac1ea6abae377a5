use super::{CAMERA_DISTANCE, CloudPoint};
use crate::foundation::error::{FestoonError, FestoonResult};
use crate::surface::PixelSurface;

const POINT_SHADER: &str = r#"
struct VsIn {
  @location(0) pos: vec3<f32>,
  @location(1) color: vec4<f32>,
};

struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) color: vec4<f32>,
};

// params = (cos(angle), sin(angle), aspect, camera distance)
@group(0) @binding(0) var<uniform> params: vec4<f32>;

@vertex
fn vs(in: VsIn) -> VsOut {
  let c = params.x;
  let s = params.y;
  let xr = in.pos.x * c - in.pos.z * s;
  let zr = in.pos.x * s + in.pos.z * c;
  let depth = zr + params.w;
  let scale = params.w / max(depth, 0.1);
  var o: VsOut;
  o.pos = vec4<f32>(xr * scale * 0.9 / params.z, -in.pos.y * scale * 0.9, 0.0, 1.0);
  o.color = in.color * clamp(scale * scale, 0.2, 1.0);
  return o;
}

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  return in.color;
}
"#;

/// wgpu-backed point renderer: one static vertex buffer, an offscreen
/// target and a mapped readback into the pixel surface. `release` frees the
/// device-side resources explicitly; dropping the structs alone is not
/// treated as a release.
pub struct GpuPointRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertices: wgpu::Buffer,
    params: wgpu::Buffer,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    readback_bytes_per_row: u32,
    point_count: u32,
    width: u32,
    height: u32,
    released: bool,
}

impl GpuPointRenderer {
    pub fn new(points: &[CloudPoint], width: u32, height: u32) -> FestoonResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                FestoonError::render("no gpu adapter available")
            }
            other => FestoonError::render(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            }))
            .map_err(|e| FestoonError::render(format!("wgpu request_device failed: {e:?}")))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("festoon_point_shader"),
            source: wgpu::ShaderSource::Wgsl(POINT_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("festoon_point_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(16),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("festoon_point_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("festoon_point_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 28,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x4,
                            offset: 12,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mut vertex_bytes = Vec::with_capacity(points.len() * 28);
        for p in points {
            for v in [p.x as f32, p.y as f32, p.z as f32] {
                vertex_bytes.extend_from_slice(&v.to_le_bytes());
            }
            for c in p.color.to_array() {
                vertex_bytes.extend_from_slice(&(f32::from(c) / 255.0).to_le_bytes());
            }
        }

        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("festoon_point_vertices"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertices, 0, &vertex_bytes);

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("festoon_point_params"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("festoon_point_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params.as_entire_binding(),
            }],
        });

        let (target, target_view, readback, readback_bytes_per_row) =
            create_target(&device, width, height)?;

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group,
            vertices,
            params,
            target,
            target_view,
            readback,
            readback_bytes_per_row,
            point_count: points.len() as u32,
            width,
            height,
            released: false,
        })
    }

    /// Recreates only the offscreen target; vertex data stays on the device.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.released || (width, height) == (self.width, self.height) {
            return;
        }
        match create_target(&self.device, width, height) {
            Ok((target, target_view, readback, bytes_per_row)) => {
                self.target.destroy();
                self.readback.destroy();
                self.target = target;
                self.target_view = target_view;
                self.readback = readback;
                self.readback_bytes_per_row = bytes_per_row;
                self.width = width;
                self.height = height;
            }
            Err(err) => tracing::warn!(%err, "gpu target resize failed, keeping old viewport"),
        }
    }

    pub fn render(&mut self, angle: f64, surface: &mut PixelSurface) -> FestoonResult<()> {
        if self.released {
            return Err(FestoonError::render("gpu point renderer was released"));
        }
        if (surface.width(), surface.height()) != (self.width, self.height) {
            self.resize(surface.width(), surface.height());
        }

        let aspect = (self.width as f32) / (self.height.max(1) as f32);
        let mut param_bytes = [0u8; 16];
        param_bytes[0..4].copy_from_slice(&(angle.cos() as f32).to_le_bytes());
        param_bytes[4..8].copy_from_slice(&(angle.sin() as f32).to_le_bytes());
        param_bytes[8..12].copy_from_slice(&aspect.to_le_bytes());
        param_bytes[12..16].copy_from_slice(&(CAMERA_DISTANCE as f32).to_le_bytes());
        self.queue.write_buffer(&self.params, 0, &param_bytes);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("festoon_point_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("festoon_point_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertices.slice(..));
            pass.draw(0..self.point_count, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.readback_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| FestoonError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| FestoonError::render("readback channel closed"))?
            .map_err(|e| FestoonError::render(format!("readback map failed: {e:?}")))?;

        {
            let mapped = slice.get_mapped_range();
            let row_bytes = (self.width as usize) * 4;
            let padded = self.readback_bytes_per_row as usize;
            surface.clear();
            for row in 0..self.height as usize {
                let start = row * padded;
                let pixels = &mapped[start..start + row_bytes];
                for (col, px) in pixels.chunks_exact(4).enumerate() {
                    surface.plot(
                        col as i64,
                        row as i64,
                        crate::foundation::core::Rgba8Premul {
                            r: px[0],
                            g: px[1],
                            b: px[2],
                            a: px[3],
                        },
                        1.0,
                    );
                }
            }
        }
        self.readback.unmap();
        Ok(())
    }

    /// Frees GPU buffers and forces context loss. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.vertices.destroy();
        self.params.destroy();
        self.readback.destroy();
        self.target.destroy();
        self.device.destroy();
        self.released = true;
    }
}

fn create_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> FestoonResult<(wgpu::Texture, wgpu::TextureView, wgpu::Buffer, u32)> {
    let bytes_per_row_unpadded = width
        .checked_mul(4)
        .ok_or_else(|| FestoonError::render("render target width overflow"))?;
    let bytes_per_row = align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    let buffer_size = (bytes_per_row as u64)
        .checked_mul(u64::from(height))
        .ok_or_else(|| FestoonError::render("readback buffer size overflow"))?;

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("festoon_point_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("festoon_point_readback"),
        size: buffer_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    Ok((target, target_view, readback, bytes_per_row))
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

use image::RgbaImage;
use slotmap::SlotMap;

use crate::assets::AssetError;
use crate::coords::ScreenPoint;
use crate::paint::{Color, Painter, Rect, TextureUploader};

slotmap::new_key_type! {
    pub struct TextureKey;
}

const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    /// sRGB tint; converted to linear in the shader.
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteUniforms {
    pub projection: [[f32; 4]; 4],
}

/// Handle of a texture owned by a [`SpriteRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteTexture {
    key: TextureKey,
    width: u32,
    height: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Consecutive vertices sharing one texture. `None` is the white texture used
/// for flat fills.
struct Batch {
    texture: Option<TextureKey>,
    start: u32,
    end: u32,
}

/// Textured-quad renderer backing the map view on the GPU.
pub struct SpriteRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    textures: SlotMap<TextureKey, GpuTexture>,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    frame_vertices: Vec<SpriteVertex>,
    batches: Vec<Batch>,
    max_texture_size: u32,
}

impl SpriteRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_uniforms"),
            size: std::mem::size_of::<SpriteUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let initial_capacity = 6 * 4096;
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite_vertices"),
            size: (initial_capacity * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite_uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite_texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Zoomed tiles are stretched, so filter linearly.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = create_texture(device, queue, &texture_layout, &sampler, 1, 1, &[255; 4], "sprite_white");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<SpriteVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        // position
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                        // uv
                        wgpu::VertexAttribute {
                            offset: 8,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                        // color
                        wgpu::VertexAttribute {
                            offset: 16,
                            shader_location: 2,
                            format: wgpu::VertexFormat::Float32x4,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_bind_group,
            uniform_buffer,
            texture_layout,
            sampler,
            white,
            textures: SlotMap::with_key(),
            vertex_buffer,
            vertex_capacity: initial_capacity,
            frame_vertices: Vec::new(),
            batches: Vec::new(),
            max_texture_size: device.limits().max_texture_dimension_2d,
        }
    }

    /// Clear vertices and write the ortho projection uniform.
    pub fn begin_frame(&mut self, queue: &wgpu::Queue, screen_w: u32, screen_h: u32) {
        self.frame_vertices.clear();
        self.batches.clear();

        let sw = screen_w as f32;
        let sh = screen_h as f32;

        #[rustfmt::skip]
        let projection: [[f32; 4]; 4] = [
            [2.0 / sw,  0.0,        0.0, 0.0],
            [0.0,      -2.0 / sh,   0.0, 0.0],
            [0.0,       0.0,        1.0, 0.0],
            [-1.0,      1.0,        0.0, 1.0],
        ];

        let uniforms = SpriteUniforms { projection };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Painter for this frame. Uploads go straight to `device`/`queue`.
    pub fn frame<'a>(&'a mut self, device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> SpriteFrame<'a> {
        SpriteFrame {
            renderer: self,
            device,
            queue,
        }
    }

    fn push(&mut self, texture: Option<TextureKey>, vertices: &[SpriteVertex]) {
        let start = self.frame_vertices.len() as u32;
        self.frame_vertices.extend_from_slice(vertices);
        let end = self.frame_vertices.len() as u32;
        match self.batches.last_mut() {
            Some(batch) if batch.texture == texture => batch.end = end,
            _ => self.batches.push(Batch { texture, start, end }),
        }
    }

    fn push_quad(&mut self, texture: Option<TextureKey>, rect: Rect, color: Color) {
        let (x0, y0) = (rect.x, rect.y);
        let (x1, y1) = (rect.x + rect.width, rect.y + rect.height);
        let v = |x: f32, y: f32, u: f32, w: f32| SpriteVertex {
            position: [x, y],
            uv: [u, w],
            color,
        };
        self.push(
            texture,
            &[
                v(x0, y0, 0.0, 0.0),
                v(x1, y0, 1.0, 0.0),
                v(x0, y1, 0.0, 1.0),
                v(x1, y0, 1.0, 0.0),
                v(x1, y1, 1.0, 1.0),
                v(x0, y1, 0.0, 1.0),
            ],
        );
    }

    /// Upload vertices to GPU. Returns vertex count for render().
    pub fn flush(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) -> u32 {
        let vertex_count = self.frame_vertices.len() as u32;
        if self.frame_vertices.is_empty() {
            return 0;
        }

        if self.frame_vertices.len() > self.vertex_capacity {
            self.vertex_capacity = self.frame_vertices.len().next_power_of_two();
            self.vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("sprite_vertices"),
                size: (self.vertex_capacity * std::mem::size_of::<SpriteVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }

        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.frame_vertices));

        vertex_count
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, vertex_count: u32) {
        if vertex_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for batch in &self.batches {
            let texture = match batch.texture {
                Some(key) => match self.textures.get(key) {
                    Some(t) => t,
                    None => continue,
                },
                None => &self.white,
            };
            render_pass.set_bind_group(1, &texture.bind_group, &[]);
            render_pass.draw(batch.start..batch.end, 0..1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
    rgba: &[u8],
    label: &str,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    GpuTexture {
        _texture: texture,
        bind_group,
    }
}

/// One frame's worth of drawing into a [`SpriteRenderer`].
pub struct SpriteFrame<'a> {
    renderer: &'a mut SpriteRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl Painter for SpriteFrame<'_> {
    type Texture = SpriteTexture;

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.renderer.push_quad(None, rect, color);
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Color) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let v = |p: &ScreenPoint| SpriteVertex {
            position: [p.x, p.y],
            uv: [0.0, 0.0],
            color,
        };
        let fan: Vec<SpriteVertex> = rest
            .windows(2)
            .flat_map(|pair| [v(first), v(&pair[0]), v(&pair[1])])
            .collect();
        self.renderer.push(None, &fan);
    }

    fn stroke_polygon(&mut self, points: &[ScreenPoint], color: Color) {
        let n = points.len();
        if n < 2 {
            return;
        }
        let mut quads = Vec::with_capacity(n * 6);
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let d = b - a;
            let len = d.length();
            if len == 0.0 {
                continue;
            }
            // One pixel wide, centred on the edge.
            let off = ScreenPoint::new(-d.y / len * 0.5, d.x / len * 0.5);
            let v = |p: ScreenPoint| SpriteVertex {
                position: [p.x, p.y],
                uv: [0.0, 0.0],
                color,
            };
            quads.extend_from_slice(&[
                v(a + off),
                v(b + off),
                v(a - off),
                v(b + off),
                v(b - off),
                v(a - off),
            ]);
        }
        self.renderer.push(None, &quads);
    }

    fn draw_texture(&mut self, texture: &SpriteTexture, at: ScreenPoint) {
        let rect = Rect::new(at.x, at.y, texture.width as f32, texture.height as f32);
        self.renderer.push_quad(Some(texture.key), rect, WHITE);
    }

    fn draw_texture_stretched(&mut self, texture: &SpriteTexture, rect: Rect) {
        self.renderer.push_quad(Some(texture.key), rect, WHITE);
    }
}

impl TextureUploader for SpriteFrame<'_> {
    fn upload(&mut self, image: RgbaImage) -> Result<SpriteTexture, AssetError> {
        let (width, height) = image.dimensions();
        let max = self.renderer.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(AssetError::Upload {
                reason: format!("{width}x{height} outside 1..={max}"),
            });
        }
        let gpu = create_texture(
            self.device,
            self.queue,
            &self.renderer.texture_layout,
            &self.renderer.sampler,
            width,
            height,
            image.as_raw(),
            "tile_texture",
        );
        let key = self.renderer.textures.insert(gpu);
        Ok(SpriteTexture { key, width, height })
    }
}

//! Headless wgpu backend.
//!
//! Emulates GL-style binding on top of wgpu: `bind_framebuffer` and
//! `set_viewport` only record state, and every `clear` / `draw_texture`
//! records and submits its own render pass against the recorded target.
//!
//! All textures are `Rgba8Unorm`. Texture row 0 is NDC `y = -1`, matching
//! the framebuffer row order of [`HostRenderer::read_pixels`].

mod pipeline;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::error::{GfxError, GfxResult};
use crate::texture::{FilterMode, TextureQuad};
use crate::transform::{ColorMatrix, GeometryMatrix};

use self::pipeline::{DrawUniform, QuadPipeline, TEXTURE_FORMAT};
use super::HostRenderer;

/// Initialization parameters for [`WgpuHost`].
#[derive(Debug, Clone)]
pub struct WgpuHostInit {
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Only accept a software adapter.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// The backend itself needs none.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,
}

impl Default for WgpuHostInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Texture handle of [`WgpuHost`].
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    filter: FilterMode,
}

impl WgpuTexture {
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Framebuffer handle of [`WgpuHost`].
#[derive(Debug)]
pub struct WgpuFramebuffer {
    key: u64,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    // Screen framebuffers own their texture; texture framebuffers share it.
    owns_texture: bool,
}

impl WgpuFramebuffer {
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }
}

struct Bound {
    key: u64,
    view: wgpu::TextureView,
    size: (u32, u32),
}

#[derive(Default)]
struct Binding {
    bound: Option<Bound>,
    viewport: (i32, i32, u32, u32),
    next_key: u64,
}

/// wgpu implementation of [`HostRenderer`] without a window surface.
pub struct WgpuHost {
    adapter_info: wgpu::AdapterInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: QuadPipeline,
    binding: Mutex<Binding>,
}

impl WgpuHost {
    /// Creates a device and queue, blocking on adapter/device acquisition.
    pub fn new(init: WgpuHostInit) -> Result<Self> {
        pollster::block_on(Self::new_async(init))
    }

    pub async fn new_async(init: WgpuHostInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vellum device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let adapter_info = adapter.get_info();
        log::info!(
            "wgpu host on {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let pipeline = QuadPipeline::new(&device);
        Ok(Self {
            adapter_info,
            device,
            queue,
            pipeline,
            binding: Mutex::new(Binding::default()),
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Creates a framebuffer with its own color texture, standing in for a window.
    ///
    /// Register it with [`RenderTarget::screen`](crate::target::RenderTarget::screen).
    pub fn create_screen(&self, width: u32, height: u32) -> GfxResult<WgpuFramebuffer> {
        self.check_size(width, height).map_err(GfxError::CreateFramebuffer)?;
        let texture = self.allocate(width, height, "vellum screen");
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuFramebuffer {
            key: self.next_key(),
            texture,
            view,
            owns_texture: true,
        })
    }

    fn next_key(&self) -> u64 {
        let mut b = self.binding.lock();
        b.next_key += 1;
        b.next_key
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), String> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(format!("{width}x{height} outside 1..={max}"));
        }
        Ok(())
    }

    fn allocate(&self, width: u32, height: u32, label: &str) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    fn write(&self, texture: &wgpu::Texture, width: u32, height: u32, pixels: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    /// Bound view plus the viewport clamped to its extent.
    fn target(&self) -> Option<(wgpu::TextureView, (i32, i32, u32, u32))> {
        let b = self.binding.lock();
        let bound = b.bound.as_ref()?;
        let (vx, vy, vw, vh) = b.viewport;
        let (tw, th) = bound.size;

        let x0 = vx.clamp(0, tw as i32);
        let y0 = vy.clamp(0, th as i32);
        let x1 = (vx as i64 + vw as i64).clamp(0, tw as i64) as i32;
        let y1 = (vy as i64 + vh as i64).clamp(0, th as i64) as i32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((bound.view.clone(), (x0, y0, (x1 - x0) as u32, (y1 - y0) as u32)))
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

impl HostRenderer for WgpuHost {
    type Texture = WgpuTexture;
    type Framebuffer = WgpuFramebuffer;

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> GfxResult<WgpuTexture> {
        self.check_size(width, height).map_err(GfxError::CreateTexture)?;
        if let Some(pixels) = pixels {
            if pixels.len() != expected_len(width, height) {
                return Err(GfxError::CreateTexture(format!(
                    "expected {} bytes of pixel data, got {}",
                    expected_len(width, height),
                    pixels.len()
                )));
            }
        }

        let texture = self.allocate(width, height, "vellum texture");
        if let Some(pixels) = pixels {
            self.write(&texture, width, height, pixels);
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(WgpuTexture { texture, view, filter })
    }

    fn update_texture(
        &self,
        texture: &WgpuTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GfxResult<()> {
        let size = texture.texture.size();
        if (size.width, size.height) != (width, height) || pixels.len() != expected_len(width, height) {
            return Err(GfxError::CreateTexture("upload does not match texture size".into()));
        }
        self.write(&texture.texture, width, height, pixels);
        Ok(())
    }

    fn delete_texture(&self, texture: WgpuTexture) {
        texture.texture.destroy();
    }

    fn create_framebuffer(&self, texture: &WgpuTexture) -> GfxResult<WgpuFramebuffer> {
        Ok(WgpuFramebuffer {
            key: self.next_key(),
            texture: texture.texture.clone(),
            view: texture.view.clone(),
            owns_texture: false,
        })
    }

    fn delete_framebuffer(&self, framebuffer: WgpuFramebuffer) {
        let mut b = self.binding.lock();
        if b.bound.as_ref().is_some_and(|bound| bound.key == framebuffer.key) {
            b.bound = None;
        }
        drop(b);
        if framebuffer.owns_texture {
            framebuffer.texture.destroy();
        }
    }

    fn bind_framebuffer(&self, framebuffer: &WgpuFramebuffer) {
        let size = framebuffer.texture.size();
        self.binding.lock().bound = Some(Bound {
            key: framebuffer.key,
            view: framebuffer.view.clone(),
            size: (size.width, size.height),
        });
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.binding.lock().viewport = (x, y, width, height);
    }

    fn clear(&self, rgba: [f32; 4]) {
        let Some(view) = self.binding.lock().bound.as_ref().map(|b| b.view.clone()) else {
            log::warn!("WgpuHost: clear with no framebuffer bound");
            return;
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vellum clear encoder"),
        });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vellum clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: rgba[0] as f64,
                            g: rgba[1] as f64,
                            b: rgba[2] as f64,
                            a: rgba[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_texture(
        &self,
        texture: &WgpuTexture,
        projection: &[f32; 16],
        quads: &[TextureQuad],
        geometry: &GeometryMatrix,
        color: &ColorMatrix,
    ) {
        let Some((view, viewport)) = self.target() else {
            log::warn!("WgpuHost: draw with no framebuffer bound or empty viewport");
            return;
        };
        if quads.is_empty() {
            return;
        }

        let uniform = DrawUniform::new(projection, geometry, color);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vellum draw encoder"),
        });
        self.pipeline.encode(
            &self.device,
            &mut encoder,
            &view,
            viewport,
            &texture.view,
            texture.filter,
            &uniform,
            quads,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixels(
        &self,
        framebuffer: &WgpuFramebuffer,
        width: u32,
        height: u32,
    ) -> GfxResult<Vec<u8>> {
        let size = framebuffer.texture.size();
        if width == 0 || height == 0 || width > size.width || height > size.height {
            return Err(GfxError::ReadPixels(format!(
                "{width}x{height} outside framebuffer {}x{}",
                size.width, size.height
            )));
        }

        let row = width * 4;
        let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vellum readback buffer"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("vellum readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &framebuffer.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|err| GfxError::ReadPixels(err.to_string()))?;
        rx.recv()
            .map_err(|err| GfxError::ReadPixels(err.to_string()))?
            .map_err(|err| GfxError::ReadPixels(err.to_string()))?;

        let mut out = Vec::with_capacity(expected_len(width, height));
        {
            let data = slice.get_mapped_range();
            for chunk in data.chunks(padded_row as usize) {
                out.extend_from_slice(&chunk[..row as usize]);
            }
        }
        staging.unmap();
        Ok(out)
    }
}

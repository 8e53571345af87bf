pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth target shared by the ground and voxel pipelines.
pub struct DepthResources
{
  pub view: wgpu::TextureView,
  size: (u32, u32),
}

impl DepthResources
{
  pub fn create(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self
  {
    let size = (config.width.max(1), config.height.max(1));
    Self { view: depth_view(device, size), size }
  }

  /// Rebuilds the target if the surface size changed.
  pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration)
  {
    let size = (config.width.max(1), config.height.max(1));
    if size != self.size
    {
      self.view = depth_view(device, size);
      self.size = size;
    }
  }
}

fn depth_view(device: &wgpu::Device, (width, height): (u32, u32)) -> wgpu::TextureView
{
  device
    .create_texture(&wgpu::TextureDescriptor {
      label: Some("Depth Texture"),
      size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
      mip_level_count: 1,
      sample_count: 1,
      dimension: wgpu::TextureDimension::D2,
      format: DEPTH_FORMAT,
      usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
      view_formats: &[],
    })
    .create_view(&wgpu::TextureViewDescriptor::default())
}

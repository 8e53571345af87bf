use voxbox_core::Camera;

//
// ──────────────────────────────────────────────────────────────
//   Camera Uniform (GPU side)
//
//   WGSL layout (lines.wgsl, voxel.wgsl):
//     view_proj : mat4x4<f32>   → 64 bytes
//     eye       : vec4<f32>     → 16 bytes (w unused)
//   Total: 80 bytes
// ──────────────────────────────────────────────────────────────
//

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform
{
  pub view_proj: [[f32; 4]; 4], // 64 bytes
  pub eye: [f32; 4],            // 16 bytes
}

// Catch CPU/GPU layout mismatches at compile time
const _: () = assert!(std::mem::size_of::<CameraUniform>() == 80);

impl CameraUniform
{
  pub fn from_camera(camera: &Camera) -> Self
  {
    Self { view_proj: camera.build_view_proj().to_cols_array_2d(), eye: camera.position.extend(1.0).to_array() }
  }
}

pub struct CameraBinding
{
  pub buffer: wgpu::Buffer,
  pub bind_group: wgpu::BindGroup,
  pub layout: wgpu::BindGroupLayout,
}

impl CameraBinding
{
  pub fn create(device: &wgpu::Device) -> Self
  {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some("Camera Buffer"),
      size: std::mem::size_of::<CameraUniform>() as u64,
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      label: Some("Camera BGL"),
      entries: &[wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
          ty: wgpu::BufferBindingType::Uniform,
          has_dynamic_offset: false,
          min_binding_size: None,
        },
        count: None,
      }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some("Camera BG"),
      layout: &layout,
      entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });

    Self { buffer, bind_group, layout }
  }

  pub fn update(&self, queue: &wgpu::Queue, camera: &Camera)
  {
    let uniform = CameraUniform::from_camera(camera);
    queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&uniform));
  }
}

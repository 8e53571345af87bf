use glam::Vec3;
use voxbox_core::VoxelModel;
use wgpu::util::DeviceExt;

use super::depth::DEPTH_FORMAT;
use super::srgb_to_linear;

//
// ──────────────────────────────────────────────────────────────
//   Voxel mesh
//
//   One unit cube (-0.5..0.5) drawn instanced: every placed voxel
//   is a VoxelInstance, the hover preview is one more instance in
//   a buffer of its own, drawn translucent after the solids.
// ──────────────────────────────────────────────────────────────
//

const ROLLOVER_RGBA: [f32; 4] = [0.0, 0.0, 1.0, 0.5];

// Initial instance capacity; the buffer doubles when outgrown
const MIN_CAPACITY: usize = 64;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VoxelInstance
{
  pub center: [f32; 3],
  pub size: f32,
  pub color: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<VoxelInstance>() == 32);

impl VoxelInstance
{
  pub fn new(center: Vec3, size: f32, color: [f32; 4]) -> Self
  {
    Self { center: center.to_array(), size, color }
  }
}

/// Per-vertex: [x, y, z,  nx, ny, nz]
type Vertex = [f32; 6];

pub struct VoxelMesh
{
  vertex_buffer: wgpu::Buffer,
  index_buffer: wgpu::Buffer,
  index_count: u32,

  instance_buffer: wgpu::Buffer,
  capacity: usize,
  count: u32,

  rollover_buffer: wgpu::Buffer,
  rollover_visible: bool,

  solid_pipeline: wgpu::RenderPipeline,
  rollover_pipeline: wgpu::RenderPipeline,
}

impl VoxelMesh
{
  pub fn create(device: &wgpu::Device, format: wgpu::TextureFormat, camera_bgl: &wgpu::BindGroupLayout) -> Self
  {
    let (vertices, indices) = build_cube();

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Voxel Vertex Buffer"),
      contents: bytemuck::cast_slice(&vertices),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Voxel Index Buffer"),
      contents: bytemuck::cast_slice(&indices),
      usage: wgpu::BufferUsages::INDEX,
    });

    let instance_buffer = create_instance_buffer(device, MIN_CAPACITY, "Voxel Instance Buffer");
    let rollover_buffer = create_instance_buffer(device, 1, "Rollover Instance Buffer");

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("Voxel Shader"),
      source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/voxel.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("Voxel Pipeline Layout"),
      bind_group_layouts: &[camera_bgl],
      push_constant_ranges: &[],
    });

    let solid_pipeline = create_pipeline(device, format, &layout, &shader, false);
    let rollover_pipeline = create_pipeline(device, format, &layout, &shader, true);

    Self {
      vertex_buffer,
      index_buffer,
      index_count: indices.len() as u32,
      instance_buffer,
      capacity: MIN_CAPACITY,
      count: 0,
      rollover_buffer,
      rollover_visible: false,
      solid_pipeline,
      rollover_pipeline,
    }
  }

  /// Re-uploads every voxel in the model.
  pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, model: &VoxelModel)
  {
    let instances = instances_for(model);

    if instances.len() > self.capacity
    {
      self.capacity = instances.len().next_power_of_two();
      self.instance_buffer = create_instance_buffer(device, self.capacity, "Voxel Instance Buffer");
      log::debug!("voxels: instance buffer grown to {}", self.capacity);
    }

    if !instances.is_empty()
    {
      queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
    }
    self.count = instances.len() as u32;
  }

  /// Moves the translucent preview cube, or hides it.
  pub fn set_rollover(&mut self, queue: &wgpu::Queue, center: Option<Vec3>, size: f32)
  {
    self.rollover_visible = center.is_some();

    if let Some(center) = center
    {
      let instance = VoxelInstance::new(center, size, ROLLOVER_RGBA);
      queue.write_buffer(&self.rollover_buffer, 0, bytemuck::bytes_of(&instance));
    }
  }

  /// Expects the camera bind group at slot 0.
  pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>)
  {
    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
    pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

    if self.count > 0
    {
      pass.set_pipeline(&self.solid_pipeline);
      pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
      pass.draw_indexed(0..self.index_count, 0, 0..self.count);
    }

    if self.rollover_visible
    {
      pass.set_pipeline(&self.rollover_pipeline);
      pass.set_vertex_buffer(1, self.rollover_buffer.slice(..));
      pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Geometry
// ──────────────────────────────────────────────────────────────
//

fn instances_for(model: &VoxelModel) -> Vec<VoxelInstance>
{
  model
    .iter()
    .map(|(cell, voxel)| {
      let [r, g, b] = srgb_to_linear(voxel.rgb());
      VoxelInstance::new(model.center(cell), model.cell_size(), [r, g, b, 1.0])
    })
    .collect()
}

/// 24 vertices so every face gets its own flat normal.
fn build_cube() -> (Vec<Vertex>, Vec<u16>)
{
  // (normal, u axis, v axis) with u × v = normal so each face winds CCW from outside
  const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),  // X+
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]), // X-
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),  // Y+
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]), // Y-
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),  // Z+
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]), // Z-
  ];

  let mut vertices = Vec::with_capacity(24);
  let mut indices = Vec::with_capacity(36);

  for (normal, u, v) in FACES
  {
    let n = Vec3::from_array(normal);
    let u = Vec3::from_array(u);
    let v = Vec3::from_array(v);
    let base = vertices.len() as u16;

    for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)]
    {
      let p = n * 0.5 + u * su + v * sv;
      vertices.push([p.x, p.y, p.z, n.x, n.y, n.z]);
    }

    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
  }

  (vertices, indices)
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize, label: &str) -> wgpu::Buffer
{
  device.create_buffer(&wgpu::BufferDescriptor {
    label: Some(label),
    size: (capacity * std::mem::size_of::<VoxelInstance>()) as u64,
    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    mapped_at_creation: false,
  })
}

//
// ──────────────────────────────────────────────────────────────
//   Pipelines
// ──────────────────────────────────────────────────────────────
//

fn create_pipeline(
  device: &wgpu::Device,
  format: wgpu::TextureFormat,
  layout: &wgpu::PipelineLayout,
  shader: &wgpu::ShaderModule,
  translucent: bool,
) -> wgpu::RenderPipeline
{
  let (label, blend) = if translucent
  {
    ("Rollover Pipeline", wgpu::BlendState::ALPHA_BLENDING)
  }
  else
  {
    ("Voxel Pipeline", wgpu::BlendState::REPLACE)
  };

  device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    label: Some(label),
    layout: Some(layout),
    vertex: wgpu::VertexState {
      module: shader,
      entry_point: Some("vs_main"),
      buffers: &[
        wgpu::VertexBufferLayout {
          array_stride: std::mem::size_of::<Vertex>() as u64,
          step_mode: wgpu::VertexStepMode::Vertex,
          attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,  // position
            1 => Float32x3,  // normal
          ],
        },
        wgpu::VertexBufferLayout {
          array_stride: std::mem::size_of::<VoxelInstance>() as u64,
          step_mode: wgpu::VertexStepMode::Instance,
          attributes: &wgpu::vertex_attr_array![
            2 => Float32x3,  // centre
            3 => Float32,    // size
            4 => Float32x4,  // colour
          ],
        },
      ],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    },
    fragment: Some(wgpu::FragmentState {
      module: shader,
      entry_point: Some("fs_main"),
      targets: &[Some(wgpu::ColorTargetState { format, blend: Some(blend), write_mask: wgpu::ColorWrites::ALL })],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    }),
    primitive: wgpu::PrimitiveState {
      topology: wgpu::PrimitiveTopology::TriangleList,
      strip_index_format: None,
      front_face: wgpu::FrontFace::Ccw,
      cull_mode: None,
      unclipped_depth: false,
      polygon_mode: wgpu::PolygonMode::Fill,
      conservative: false,
    },
    depth_stencil: Some(wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: !translucent,
      depth_compare: wgpu::CompareFunction::LessEqual,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    }),
    multisample: wgpu::MultisampleState::default(),
    multiview: None,
    cache: None,
  })
}

#[cfg(test)]
mod tests
{
  use super::*;
  use glam::IVec3;
  use voxbox_core::Voxel;

  #[test]
  fn cube_faces_wind_outwards()
  {
    let (vertices, indices) = build_cube();
    assert_eq!(vertices.len(), 24);
    assert_eq!(indices.len(), 36);

    for tri in indices.chunks(3)
    {
      let p = |i: u16| Vec3::new(vertices[i as usize][0], vertices[i as usize][1], vertices[i as usize][2]);
      let n = Vec3::new(vertices[tri[0] as usize][3], vertices[tri[0] as usize][4], vertices[tri[0] as usize][5]);

      let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
      assert!(face.dot(n) > 0.0);
    }
  }

  #[test]
  fn instances_sit_on_cell_centres()
  {
    let mut model = VoxelModel::for_ground(50.0, 500.0);
    model.insert(IVec3::new(-1, 0, 2), Voxel::solid(0xffffff)).expect("free cell");

    let instances = instances_for(&model);
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].center, [-25.0, 25.0, 125.0]);
    assert_eq!(instances[0].size, 50.0);
    assert_eq!(instances[0].color, [1.0, 1.0, 1.0, 1.0]);
  }
}

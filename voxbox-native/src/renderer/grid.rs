use wgpu::util::DeviceExt;

use super::depth::DEPTH_FORMAT;
use super::srgb_to_linear;

//
// ──────────────────────────────────────────────────────────────
//   Constants
// ──────────────────────────────────────────────────────────────
//

const COL_GROUND: [f32; 3] = [1.0, 1.0, 1.0];
const COL_CENTRE: [f32; 3] = [0.27, 0.27, 0.27]; // 0x444444
const COL_LINE: [f32; 3] = [0.53, 0.53, 0.53]; // 0x888888

// Lines sit just above the ground quad
const LINE_LIFT: f32 = 0.1;

//
// ──────────────────────────────────────────────────────────────
//   Vertex layout: [x, y, z,  r, g, b]
// ──────────────────────────────────────────────────────────────
//

type Vertex = [f32; 6];

//
// ──────────────────────────────────────────────────────────────
//   GroundMesh: white plane plus grid lines on y = 0
// ──────────────────────────────────────────────────────────────
//

pub struct GroundMesh
{
  plane_buffer: wgpu::Buffer,
  plane_count: u32,
  line_buffer: wgpu::Buffer,
  line_count: u32,

  plane_pipeline: wgpu::RenderPipeline,
  line_pipeline: wgpu::RenderPipeline,
}

impl GroundMesh
{
  pub fn create(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bgl: &wgpu::BindGroupLayout,
    half_extent: f32,
    divisions: u32,
  ) -> Self
  {
    let plane = build_plane(half_extent);
    let lines = build_lines(half_extent, divisions);

    let plane_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Ground Plane Buffer"),
      contents: bytemuck::cast_slice(&plane),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let line_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Grid Line Buffer"),
      contents: bytemuck::cast_slice(&lines),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("Lines Shader"),
      source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/lines.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("Ground Pipeline Layout"),
      bind_group_layouts: &[camera_bgl],
      push_constant_ranges: &[],
    });

    let plane_pipeline =
      create_pipeline(device, format, &layout, &shader, wgpu::PrimitiveTopology::TriangleList, "Ground Pipeline");
    let line_pipeline =
      create_pipeline(device, format, &layout, &shader, wgpu::PrimitiveTopology::LineList, "Grid Pipeline");

    Self {
      plane_buffer,
      plane_count: plane.len() as u32,
      line_buffer,
      line_count: lines.len() as u32,
      plane_pipeline,
      line_pipeline,
    }
  }

  /// Expects the camera bind group at slot 0.
  pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>)
  {
    pass.set_pipeline(&self.plane_pipeline);
    pass.set_vertex_buffer(0, self.plane_buffer.slice(..));
    pass.draw(0..self.plane_count, 0..1);

    pass.set_pipeline(&self.line_pipeline);
    pass.set_vertex_buffer(0, self.line_buffer.slice(..));
    pass.draw(0..self.line_count, 0..1);
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Geometry builders
// ──────────────────────────────────────────────────────────────
//

fn make_vertex(pos: [f32; 3], col: [f32; 3]) -> Vertex
{
  let col = srgb_to_linear(col);
  [pos[0], pos[1], pos[2], col[0], col[1], col[2]]
}

fn build_plane(h: f32) -> Vec<Vertex>
{
  vec![
    make_vertex([-h, 0.0, -h], COL_GROUND),
    make_vertex([-h, 0.0, h], COL_GROUND),
    make_vertex([h, 0.0, h], COL_GROUND),
    make_vertex([-h, 0.0, -h], COL_GROUND),
    make_vertex([h, 0.0, h], COL_GROUND),
    make_vertex([h, 0.0, -h], COL_GROUND),
  ]
}

/// Square grid of `divisions` cells per side, centre lines darker.
fn build_lines(h: f32, divisions: u32) -> Vec<Vertex>
{
  let step = 2.0 * h / divisions as f32;
  let centre = divisions / 2;
  let mut verts = Vec::with_capacity(4 * (divisions as usize + 1));

  for i in 0..=divisions
  {
    let offset = -h + i as f32 * step;
    let col = if i == centre && divisions % 2 == 0 { COL_CENTRE } else { COL_LINE };

    verts.push(make_vertex([-h, LINE_LIFT, offset], col));
    verts.push(make_vertex([h, LINE_LIFT, offset], col));
    verts.push(make_vertex([offset, LINE_LIFT, -h], col));
    verts.push(make_vertex([offset, LINE_LIFT, h], col));
  }

  verts
}

//
// ──────────────────────────────────────────────────────────────
//   Pipeline
// ──────────────────────────────────────────────────────────────
//

fn create_pipeline(
  device: &wgpu::Device,
  format: wgpu::TextureFormat,
  layout: &wgpu::PipelineLayout,
  shader: &wgpu::ShaderModule,
  topology: wgpu::PrimitiveTopology,
  label: &str,
) -> wgpu::RenderPipeline
{
  device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    label: Some(label),
    layout: Some(layout),
    vertex: wgpu::VertexState {
      module: shader,
      entry_point: Some("vs_main"),
      buffers: &[wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
          0 => Float32x3,  // position
          1 => Float32x3,  // colour
        ],
      }],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    },
    fragment: Some(wgpu::FragmentState {
      module: shader,
      entry_point: Some("fs_main"),
      targets: &[Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
      })],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    }),
    primitive: wgpu::PrimitiveState {
      topology,
      strip_index_format: None,
      front_face: wgpu::FrontFace::Ccw,
      cull_mode: None,
      unclipped_depth: false,
      polygon_mode: wgpu::PolygonMode::Fill,
      conservative: false,
    },
    depth_stencil: Some(wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: true,
      depth_compare: wgpu::CompareFunction::LessEqual,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    }),
    multisample: wgpu::MultisampleState::default(),
    multiview: None,
    cache: None,
  })
}

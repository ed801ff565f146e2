//! Accelerator transform backend on wgpu.
//!
//! Every invocation acquires its own device context, uploads the signal,
//! runs the radix-2 pipeline, reads back, and releases everything. No device
//! state survives across invocations.

use std::sync::mpsc;

use num_complex::Complex64;
use wgpu::util::DeviceExt;

use super::{Direction, FailurePolicy, TransformBackend, TransformError};
use crate::shaders;

const WORKGROUP_SIZE: u32 = 64;

/// Accelerator-bound DFT via a wgpu compute pipeline.
///
/// Device arithmetic is f32 (WGSL has no f64): samples are narrowed on
/// upload and widened on readback. Only power-of-two lengths fit the
/// radix-2 pipeline; anything else is a recoverable failure, like every
/// other accelerator fault.
#[derive(Debug, Default)]
pub struct WgpuFft;

impl WgpuFft {
    pub fn new() -> Self {
        Self
    }
}

impl TransformBackend for WgpuFft {
    fn name(&self) -> &'static str {
        "GPU"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Recoverable
    }

    fn transform(
        &self,
        input: &[Complex64],
        direction: Direction,
    ) -> Result<Vec<Complex64>, TransformError> {
        let n = input.len();
        // A length-0 or length-1 DFT is the identity in both directions.
        if n <= 1 {
            return Ok(input.to_vec());
        }
        if !n.is_power_of_two() {
            return Err(TransformError::UnsupportedLength(n));
        }
        let ctx = GpuCtx::acquire()?;
        ctx.run(input, direction)
    }
}

/// Device context for one transform: adapter, device, queue, and the three
/// compiled pipelines. Built on acquire, dropped after readback.
struct GpuCtx {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    reverse: wgpu::ComputePipeline,
    forward: wgpu::ComputePipeline,
    inverse: wgpu::ComputePipeline,
}

impl GpuCtx {
    fn acquire() -> Result<Self, TransformError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(TransformError::AdapterUnavailable)?;
        tracing::debug!(adapter = %adapter.get_info().name, "acquired accelerator adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("fftbench"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| TransformError::Device(e.to_string()))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fft"),
            source: wgpu::ShaderSource::Wgsl(shaders::FFT.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fft"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fft"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let [reverse, forward, inverse] = ["bit_reverse", "fft_stage", "ifft_stage"].map(|entry| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(TransformError::Pipeline(err.to_string()));
        }

        Ok(Self {
            device,
            queue,
            layout,
            reverse,
            forward,
            inverse,
        })
    }

    fn run(
        &self,
        input: &[Complex64],
        direction: Direction,
    ) -> Result<Vec<Complex64>, TransformError> {
        let n = input.len();
        let bits = n.trailing_zeros();
        let interleaved: Vec<f32> = input
            .iter()
            .flat_map(|c| [c.re as f32, c.im as f32])
            .collect();
        let bytes = std::mem::size_of_val(interleaved.as_slice()) as u64;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let data_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("signal"),
                contents: bytemuck::cast_slice(&interleaved),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let stage_pipeline = match direction {
            Direction::Forward => &self.forward,
            Direction::Inverse => &self.inverse,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("fft") });

        let reverse_groups = (n as u32).div_ceil(WORKGROUP_SIZE);
        self.record_pass(&mut encoder, &self.reverse, &data_buf, n, 0, bits, reverse_groups);

        let stage_groups = (n as u32 / 2).div_ceil(WORKGROUP_SIZE);
        for stage in 0..bits {
            self.record_pass(&mut encoder, stage_pipeline, &data_buf, n, stage, bits, stage_groups);
        }

        encoder.copy_buffer_to_buffer(&data_buf, 0, &staging, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(TransformError::Pipeline(err.to_string()));
        }

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| TransformError::Transfer("map callback dropped".into()))?
            .map_err(|e| TransformError::Transfer(e.to_string()))?;

        let out = {
            let view = slice.get_mapped_range();
            let floats: &[f32] = bytemuck::cast_slice(&view);
            floats
                .chunks_exact(2)
                .map(|c| Complex64::new(f64::from(c[0]), f64::from(c[1])))
                .collect()
        };
        staging.unmap();
        Ok(out)
    }

    /// Record one compute pass (permutation or butterfly stage) with its own params uniform.
    #[allow(clippy::too_many_arguments)]
    fn record_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::ComputePipeline,
        data: &wgpu::Buffer,
        n: usize,
        stage: u32,
        bits: u32,
        workgroups: u32,
    ) {
        let params: [u32; 4] = [n as u32, stage, bits, 0];
        let params_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: bytemuck::cast_slice(&params[..]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: data.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind, &[]);
        pass.dispatch_workgroups(workgroups, 1, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuFft;
    use crate::compare::max_abs_error;
    use crate::signal::synthetic_signal;

    // Device-dependent tests skip (rather than fail) on machines without an
    // adapter, so the suite stays green on headless CI.
    fn transform_or_skip(input: &[Complex64], direction: Direction) -> Option<Vec<Complex64>> {
        match WgpuFft::new().transform(input, direction) {
            Ok(out) => Some(out),
            Err(TransformError::AdapterUnavailable | TransformError::Device(_)) => {
                eprintln!("skipping: no usable accelerator on this machine");
                None
            }
            Err(e) => panic!("unexpected accelerator failure: {e}"),
        }
    }

    #[test]
    fn non_power_of_two_is_a_structured_failure() {
        let input = synthetic_signal(12);
        let err = WgpuFft::new()
            .transform(&input, Direction::Forward)
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedLength(12)));
    }

    #[test]
    fn zero_length_input_yields_empty_output() {
        let out = WgpuFft::new().transform(&[], Direction::Forward).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn single_sample_is_identity() {
        let input = [Complex64::new(0.25, -0.75)];
        let out = WgpuFft::new().transform(&input, Direction::Inverse).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], input[0]);
    }

    #[test]
    fn forward_matches_cpu_backend() {
        let input = synthetic_signal(256);
        let Some(gpu) = transform_or_skip(&input, Direction::Forward) else {
            return;
        };
        let cpu = CpuFft::new().transform(&input, Direction::Forward).unwrap();
        assert_eq!(gpu.len(), cpu.len());
        // f32 device arithmetic over 256 points: deviations sit well under 1e-2
        // against the f64 reference while real defects land orders above it.
        let err = max_abs_error(&cpu, &gpu);
        assert!(err < 1e-2, "max deviation {err}");
    }

    #[test]
    fn inverse_of_forward_scales_by_n() {
        let n = 64;
        let input = synthetic_signal(n);
        let Some(spectrum) = transform_or_skip(&input, Direction::Forward) else {
            return;
        };
        let Some(roundtrip) = transform_or_skip(&spectrum, Direction::Inverse) else {
            return;
        };
        let scaled: Vec<Complex64> = input.iter().map(|c| *c * n as f64).collect();
        let err = max_abs_error(&roundtrip, &scaled);
        assert!(err < 1e-2 * n as f64, "n={n} err={err}");
    }
}

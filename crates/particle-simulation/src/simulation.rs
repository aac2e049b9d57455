//! GPU-based particle simulation manager
//!
//! Owns the ping-pong state buffers and the physics compute pipeline. One bind
//! group exists per tick parity so that a step never has to rebuild bindings:
//! `physics_bind_groups[0]` reads A and writes B, `[1]` reads B and writes A.

use crate::backend::{BufferSlot, SlotPair};
use crate::error::{Result, SimulationError};
use crate::params::SimulationConfig;
use crate::state::StateBufferPair;
use particle_physics::{block_segments, InjectionBlock, ParticleState, TexelAddress};
use wgpu::util::DeviceExt;

const WORKGROUP_SIDE: u32 = 16;

/// Request a device able to hold the state buffers as storage bindings.
pub async fn request_device(
    adapter: &wgpu::Adapter,
    config: &SimulationConfig,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    check_limits(&adapter.limits(), config)?;

    let defaults = wgpu::Limits::default();
    let required = config.state_buffer_size();
    let required_limits = wgpu::Limits {
        max_storage_buffer_binding_size: defaults
            .max_storage_buffer_binding_size
            .max(required as u32),
        max_buffer_size: defaults.max_buffer_size.max(required),
        ..defaults
    };

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Particle Device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;

    Ok((device, queue))
}

/// Fail early if float state buffers of this size cannot be bound.
pub fn check_limits(limits: &wgpu::Limits, config: &SimulationConfig) -> Result<()> {
    let required = config.state_buffer_size();

    let binding = limits.max_storage_buffer_binding_size as u64;
    if binding < required {
        return Err(SimulationError::InsufficientLimits {
            limit: "max_storage_buffer_binding_size",
            actual: binding,
            required,
        });
    }
    if limits.max_buffer_size < required {
        return Err(SimulationError::InsufficientLimits {
            limit: "max_buffer_size",
            actual: limits.max_buffer_size,
            required,
        });
    }
    Ok(())
}

/// GPU-resident particle state and physics
pub struct GpuSimulation {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: SimulationConfig,

    states: StateBufferPair,
    _params_buffer: wgpu::Buffer,

    physics_pipeline: wgpu::ComputePipeline,
    physics_bind_groups: [wgpu::BindGroup; 2],
}

impl GpuSimulation {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, config: SimulationConfig) -> Result<Self> {
        log::info!("Initializing GpuSimulation...");
        config.validate()?;
        check_limits(&device.limits(), &config)?;

        let states = StateBufferPair::new(&device, &config);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::cast_slice(&[config.params()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let physics_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Physics Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/physics.wgsl").into()),
        });

        let physics_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Physics Bind Group Layout"),
                entries: &[
                    // Read slot
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Write slot
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
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

        log::info!("Creating physics pipeline...");
        let physics_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Physics Pipeline Layout"),
                bind_group_layouts: &[&physics_bind_group_layout],
                push_constant_ranges: &[],
            });

        let physics_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Physics Pipeline"),
            layout: Some(&physics_pipeline_layout),
            module: &physics_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let physics_bind_group = |read: BufferSlot| {
            let (read_buffer, write_buffer) = states.swap(SlotPair {
                read,
                write: read.other(),
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(match read {
                    BufferSlot::A => "Physics Bind Group (A -> B)",
                    BufferSlot::B => "Physics Bind Group (B -> A)",
                }),
                layout: &physics_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: read_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: write_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let physics_bind_groups = [
            physics_bind_group(BufferSlot::A),
            physics_bind_group(BufferSlot::B),
        ];

        log::info!("Physics pipeline created");

        Ok(Self {
            device,
            queue,
            config,
            states,
            _params_buffer: params_buffer,
            physics_pipeline,
            physics_bind_groups,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// State buffer behind `slot` (bound read-only by the renderer)
    pub fn state_buffer(&self, slot: BufferSlot) -> &wgpu::Buffer {
        self.states.buffer(slot)
    }

    /// Upload an injection block into `slot`, wrapping within the start row.
    ///
    /// Queue writes land before any later submission, so the step submitted
    /// after this in the same tick already sees the new particles.
    pub fn write_block(&self, slot: BufferSlot, start: TexelAddress, block: &InjectionBlock) {
        let side = self.config.grid_side;
        let texel_size = std::mem::size_of::<ParticleState>() as u64;
        let states = block.states();

        for segment in block_segments(start, states.len() as u32, side) {
            let src = segment.source_offset as usize;
            let len = segment.len as usize;
            let offset = segment.start.linear(side) as u64 * texel_size;
            self.queue.write_buffer(
                self.states.buffer(slot),
                offset,
                bytemuck::cast_slice(&states[src..src + len]),
            );
        }
    }

    /// Record one physics dispatch reading `slots.read` and writing `slots.write`
    pub fn encode_step(&self, encoder: &mut wgpu::CommandEncoder, slots: SlotPair) {
        let workgroups = self.config.grid_side.div_ceil(WORKGROUP_SIDE);

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Physics Compute Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.physics_pipeline);
        compute_pass.set_bind_group(0, &self.physics_bind_groups[slots.read.index()], &[]);
        compute_pass.dispatch_workgroups(workgroups, workgroups, 1);
    }

    /// Step the simulation forward by one tick
    pub fn step(&self, slots: SlotPair) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Simulation Encoder"),
            });
        self.encode_step(&mut encoder, slots);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Copy a state buffer back to the host. Blocks until the copy completes.
    pub fn read_state(&self, slot: BufferSlot) -> Result<Vec<ParticleState>> {
        let size = self.states.size();
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("State Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(self.states.buffer(slot), 0, &staging_buffer, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| SimulationError::Readback(e.to_string()))?;

        receiver
            .recv()
            .map_err(|e| SimulationError::Readback(e.to_string()))?
            .map_err(|e| SimulationError::Readback(e.to_string()))?;

        let states = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, ParticleState>(&data).to_vec()
        };
        staging_buffer.unmap();

        Ok(states)
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// Any error the device raises while `f` runs is returned as
    /// [`SimulationError::Device`].
    pub fn guarded<T>(&self, operation: &'static str, f: impl FnOnce() -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f();

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(error) => Err(SimulationError::Device {
                operation,
                message: error.to_string(),
            }),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_fit_default_grid() {
        let config = SimulationConfig::default();
        assert!(check_limits(&wgpu::Limits::default(), &config).is_ok());
    }

    #[test]
    fn test_small_limits_are_rejected() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1 << 20,
            ..wgpu::Limits::default()
        };
        let err = check_limits(&limits, &SimulationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InsufficientLimits {
                limit: "max_storage_buffer_binding_size",
                ..
            }
        ));
    }
}

//! GPU bounding box and pixel count reduction.
//!
//! Reduces a rendered instance-index image into per-instance bounding boxes
//! and pixel counts with two compute passes:
//!
//! 1. A clear pass resets the per-slot accumulator buffer (extrema to
//!    sentinel, counts to zero).
//! 2. A scan pass visits every pixel and atomically folds its coordinates
//!    and count into the slot for that pixel's instance index.
//!
//! Dispatch never blocks: it records both passes plus a copy into a fresh
//! staging buffer and parks a pending readback. Results arrive through
//! [`poll`](BoundingBoxReducer::poll), possibly several frames after
//! dispatch, paired with the hierarchy snapshot stored for the dispatch
//! frame. Everything a readback needs (instance ids, colors) is snapshotted
//! at dispatch time; the live registry is never touched from the deferred
//! path.

use crate::hierarchy::{HierarchyFrameStore, SceneHierarchyIndex};
use crate::labeling::{Color32, InstanceRegistry};
use crate::visibility::object_info::{collect_object_infos, InstanceBounds, RenderedObjectInfo};
use std::collections::VecDeque;
use std::sync::mpsc;

/// Fires exactly once per dispatch with the frame number, the visibility
/// results, and the hierarchy snapshot filtered to on-screen objects.
pub type ObjectInfoCallback = Box<dyn FnOnce(u64, Vec<RenderedObjectInfo>, SceneHierarchyIndex)>;

/// Reduction parameters uniform, matching `ReductionParams` in the shader.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ReductionParams {
    width: u32,
    height: u32,
    slot_count: u32,
    _pad: u32,
}

/// A dispatched reduction waiting for its readback to complete.
struct PendingReadback {
    frame: u64,
    staging: wgpu::Buffer,
    /// Instance id per slot, snapshotted at dispatch time.
    instance_ids: Vec<u32>,
    /// Segmentation color per slot, snapshotted at dispatch time.
    colors: Vec<Color32>,
    image_height: u32,
    callback: ObjectInfoCallback,
    receiver: Option<mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>>,
}

const MIN_SLOT_COUNT: u32 = 256;
const BOUNDS_STRIDE: u64 = std::mem::size_of::<InstanceBounds>() as u64;

/// Owns the reduction pipelines, the accumulator buffer, and the queue of
/// in-flight readbacks.
pub struct BoundingBoxReducer {
    clear_pipeline: wgpu::ComputePipeline,
    scan_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    bounds_buffer: wgpu::Buffer,
    bounds_capacity: u32,
    pending: VecDeque<PendingReadback>,
}

impl BoundingBoxReducer {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bounding Box Reduction Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../shaders/bounding_boxes.wgsl").into(),
            ),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bounding Box Reduction Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bounding Box Reduction Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let clear_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Bounding Box Clear Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("clear_bounds"),
            compilation_options: Default::default(),
            cache: None,
        });

        let scan_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Bounding Box Scan Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("scan_pixels"),
            compilation_options: Default::default(),
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Bounding Box Params Buffer"),
            size: std::mem::size_of::<ReductionParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bounds_buffer = Self::create_bounds_buffer(device, MIN_SLOT_COUNT);

        Self {
            clear_pipeline,
            scan_pipeline,
            bind_group_layout,
            params_buffer,
            bounds_buffer,
            bounds_capacity: MIN_SLOT_COUNT,
            pending: VecDeque::new(),
        }
    }

    fn create_bounds_buffer(device: &wgpu::Device, slot_count: u32) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Bounds Buffer"),
            size: slot_count as u64 * BOUNDS_STRIDE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// Records the clear and scan passes for this frame's instance-index
    /// image and parks a readback for the results. Returns immediately; the
    /// callback fires from a later [`poll`](Self::poll).
    ///
    /// `instance_index_buffer` holds one u32 instance index per pixel,
    /// row-major, as painted by the external renderer from the registry's
    /// current frame snapshot. The registry's id and color arrays are copied
    /// here so later mutation cannot affect this readback.
    ///
    /// The caller must have stored the hierarchy snapshot for `frame` in the
    /// frame store, with a subscription for this reducer.
    pub fn dispatch(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        instance_index_buffer: &wgpu::Buffer,
        width: u32,
        height: u32,
        frame: u64,
        registry: &InstanceRegistry,
        callback: ObjectInfoCallback,
    ) {
        let instance_ids = registry.frame_instance_ids().to_vec();
        let colors = registry.segmentation_colors().to_vec();
        let slot_count = (instance_ids.len() as u32).max(MIN_SLOT_COUNT);

        if slot_count > self.bounds_capacity {
            self.bounds_buffer = Self::create_bounds_buffer(device, slot_count);
            self.bounds_capacity = slot_count;
        }

        let params = ReductionParams {
            width,
            height,
            slot_count,
            _pad: 0,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bounding Box Reduction Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_index_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.bounds_buffer.as_entire_binding(),
                },
            ],
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Bounding Box Reduction Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.clear_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(slot_count.div_ceil(256), 1, 1);

            compute_pass.set_pipeline(&self.scan_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(width.div_ceil(16), height.div_ceil(16), 1);
        }

        // Fresh staging buffer per dispatch so several frames can be in
        // flight at once.
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Bounds Readback Buffer"),
            size: slot_count as u64 * BOUNDS_STRIDE,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(
            &self.bounds_buffer,
            0,
            &staging,
            0,
            slot_count as u64 * BOUNDS_STRIDE,
        );

        self.pending.push_back(PendingReadback {
            frame,
            staging,
            instance_ids,
            colors,
            image_height: height,
            callback,
            receiver: None,
        });
    }

    /// Drives pending readbacks forward, firing callbacks for every
    /// completed one. Call once per frame after submitting the encoder.
    ///
    /// Readbacks complete in dispatch order. On a readback error the frame's
    /// results are skipped (logged, non-fatal) but its hierarchy
    /// subscription is still released.
    pub fn poll(&mut self, device: &wgpu::Device, store: &mut HierarchyFrameStore) {
        loop {
            let Some(front) = self.pending.front_mut() else {
                return;
            };

            if front.receiver.is_none() {
                let (sender, receiver) = mpsc::channel();
                front.staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                    sender.send(result).ok();
                });
                front.receiver = Some(receiver);
            }

            let _ = device.poll(wgpu::PollType::Poll);

            let receiver = front.receiver.as_ref().expect("receiver just installed");
            match receiver.try_recv() {
                Ok(Ok(())) => {
                    let readback = self.pending.pop_front().expect("front exists");
                    Self::complete_readback(readback, store);
                }
                Ok(Err(error)) => {
                    let readback = self.pending.pop_front().expect("front exists");
                    log::error!(
                        "Instance bounds readback failed for frame {}: {error}",
                        readback.frame
                    );
                    store.release(readback.frame);
                }
                // Still in flight; later dispatches cannot be ready either.
                Err(mpsc::TryRecvError::Empty) => return,
                Err(mpsc::TryRecvError::Disconnected) => {
                    let readback = self.pending.pop_front().expect("front exists");
                    log::error!(
                        "Instance bounds readback dropped for frame {} without completing",
                        readback.frame
                    );
                    store.release(readback.frame);
                }
            }
        }
    }

    fn complete_readback(readback: PendingReadback, store: &mut HierarchyFrameStore) {
        let (infos, visible_ids) = {
            let view = readback.staging.slice(..).get_mapped_range();
            let bounds: &[InstanceBounds] = bytemuck::cast_slice(&view);
            collect_object_infos(
                bounds,
                &readback.instance_ids,
                &readback.colors,
                readback.image_height,
            )
        };
        readback.staging.unmap();

        // Missing snapshot for this frame is a broken invariant; the frame
        // store panics. Filter the snapshot down to on-screen objects.
        let filtered = store.get(readback.frame).filtered_clone(&visible_ids);
        (readback.callback)(readback.frame, infos, filtered);
        store.release(readback.frame);
    }

    /// Drops every queued readback without firing its callback, releasing
    /// each one's hierarchy subscription. For teardown while readbacks are
    /// still in flight.
    pub fn cancel_pending(&mut self, store: &mut HierarchyFrameStore) {
        let cancelled = self.pending.len();
        for readback in self.pending.drain(..) {
            if store.contains_frame(readback.frame) {
                store.release(readback.frame);
            }
        }
        if cancelled > 0 {
            log::warn!("Cancelled {cancelled} pending instance bounds readbacks");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

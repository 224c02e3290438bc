/// Buffer - host-visible Vulkan buffer backed by a gpu-allocator allocation

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::nebula3d::render::{checked_range, BufferInfo, BufferUsage};
use nebula_3d_engine::{engine_bail, engine_err, engine_error, engine_warn};

use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::buffer_usage_to_vk;

const SOURCE: &str = "nebula3d::vulkan::Buffer";

/// Vulkan buffer + its allocation
///
/// Allocated `CpuToGpu` and kept persistently mapped by gpu-allocator; reads and writes copy through the mapped slice.
pub(crate) struct Buffer {
    pub(crate) buffer: vk::Buffer,
    allocation: Allocation,
    pub(crate) info: BufferInfo,
}

impl Buffer {
    /// Create a buffer of exactly `size` bytes in CPU-writable memory
    pub(crate) fn new(context: &mut DeviceContext, usage: BufferUsage, size: u64) -> Result<Self> {
        if size == 0 {
            engine_bail!(SOURCE, "Cannot create a zero-sized {:?} buffer", usage);
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(buffer_usage_to_vk(usage) | vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = context.device().create_buffer(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = context.device().get_buffer_memory_requirements(buffer);

            let allocation = match context.allocator().allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    context.device().destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!(SOURCE, "Out of GPU memory for buffer (required: {:.2} MB): {:?}", size_mb, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = context.device().bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                context.allocator().free(allocation).ok();
                context.device().destroy_buffer(buffer, None);
                return Err(engine_err!(SOURCE, "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Self {
                buffer,
                allocation,
                info: BufferInfo { size, usage },
            })
        }
    }

    /// Copy `data` in at `offset`
    ///
    /// # Panics
    ///
    /// When the range does not fit in the buffer.
    pub(crate) fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let range = checked_range(self.info.size, offset, data.len());
        let mapped = self.allocation
            .mapped_slice_mut()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?;
        mapped[range].copy_from_slice(data);
        Ok(())
    }

    /// Copy `out.len()` bytes out from `offset`
    ///
    /// # Panics
    ///
    /// When the range does not fit in the buffer.
    pub(crate) fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let range = checked_range(self.info.size, offset, out.len());
        let mapped = self.allocation
            .mapped_slice()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?;
        out.copy_from_slice(&mapped[range]);
        Ok(())
    }

    pub(crate) fn destroy(self, context: &mut DeviceContext) {
        if let Err(e) = context.allocator().free(self.allocation) {
            engine_warn!(SOURCE, "Failed to free buffer allocation: {:?}", e);
        }
        unsafe {
            context.device().destroy_buffer(self.buffer, None);
        }
    }
}

/// Buffer descriptions

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    Storage,
    /// Transfer source (upload staging)
    Staging,
}

/// Buffer metadata kept alongside the native object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    /// Size in bytes, exactly as requested at creation
    pub size: u64,
    pub usage: BufferUsage,
}

/// Byte range `[offset, offset + len)` of a buffer
///
/// Panics when the range does not fit in `size`: writing or reading past the
/// end of a mapped allocation is a caller contract violation.
pub fn checked_range(size: u64, offset: u64, len: usize) -> std::ops::Range<usize> {
    let end = offset
        .checked_add(len as u64)
        .filter(|end| *end <= size)
        .unwrap_or_else(|| {
            panic!(
                "buffer access out of range: offset {} + len {} > size {}",
                offset, len, size
            )
        });
    offset as usize..end as usize
}

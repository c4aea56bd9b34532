use crate::{NetSys, NetSysError};
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use kernel_sync::{CacheStats, ExecutionContext, ObjectCache};

/// Fixed-size packet buffers for the network stack.
pub struct PacketPool {
    cache: ObjectCache,
}

impl PacketPool {
    /// # Errors
    /// [`NetSysError::Pool`] for a zero packet size or depth.
    pub fn new(packet_size: usize, depth: usize) -> Result<Self, NetSysError> {
        Ok(Self {
            cache: ObjectCache::new("net-packet", packet_size, depth)?,
        })
    }

    #[must_use]
    pub const fn packet_size(&self) -> usize {
        self.cache.object_size()
    }

    /// A zeroed buffer, returned to the pool when dropped.
    ///
    /// # Errors
    /// [`NetSysError::Pool`] when every buffer is in use.
    pub fn alloc<'a>(&'a self, sys: &NetSys<'a>) -> Result<PacketBuf<'a>, NetSysError> {
        let ctx = sys.context();
        let ptr = self.cache.acquire(ctx)?;
        Ok(PacketBuf {
            pool: self,
            ctx,
            ptr,
        })
    }

    #[must_use]
    pub fn stats(&self, sys: &NetSys<'_>) -> CacheStats {
        self.cache.stats(sys.context())
    }
}

/// One packet buffer borrowed from a [`PacketPool`].
pub struct PacketBuf<'a> {
    pool: &'a PacketPool,
    ctx: &'a dyn ExecutionContext,
    ptr: NonNull<u8>,
}

impl Deref for PacketBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // Safety: the cache hands out `packet_size` bytes owned by this buffer.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.pool.packet_size()) }
    }
}

impl DerefMut for PacketBuf<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // Safety: as above, and `&mut self` makes the access unique.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.pool.packet_size()) }
    }
}

impl Drop for PacketBuf<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.cache.release(self.ctx, self.ptr) {
            log::error!("packet buffer not returned: {e}");
        }
    }
}

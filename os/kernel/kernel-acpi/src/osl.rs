//! # OS services layer façade
//!
//! [`Osl`] is the one object the interpreter calls back into. It owns every
//! lock, semaphore and object cache the interpreter creates and borrows the
//! kernel's platform services for its whole lifetime.
//!
//! ```text
//! Uninitialized ─configure→ Configured ─activate→ Active
//!     ─begin_shutdown→ ShuttingDown ─terminate→ Terminated
//! ```
//!
//! Transitions only move forward. Callbacks are accepted while `Active` or
//! `ShuttingDown`; after `Terminated` every callback fails with
//! [`OslError::Terminated`] and a fresh façade must be built.
//!
//! Recursive acquisition or foreign release of an interpreter lock is a
//! programming error in the interpreter or the kernel and stops the system
//! with a `BUGCHECK` panic instead of being reported as a status.

use crate::error::OslError;
use crate::handles::{CacheHandle, HandleTable, LockHandle, MutexHandle, SemaphoreHandle};
use crate::platform::{
    Clock, InterruptBinding, InterruptRouter, InterruptServiceRoutine, PciConfigSpace, PhysMapper,
    PortIo, PortWidth,
};
use crate::printf::{self, ArgList, FormatArg, LogSink, SliceArgs};
use crate::rsdp::{AcpiRoots, XSDP_LEN};
use alloc::alloc::{alloc, dealloc};
use alloc::vec::Vec;
use core::alloc::Layout;
use core::ptr::NonNull;
use kernel_info::hwmap::{BootHardwareMap, PhysAddr};
use kernel_info::memory::{PAGE_SIZE, page_base, pages_spanned};
use kernel_info::width::{
    AcpiCpuFlags, AcpiIoAddress, AcpiPciId, AcpiPhysicalAddress, AcpiSize, AcpiThreadId,
    MachineWidth,
};
use kernel_sync::{
    CacheStats, ExecutionContext, IrqGuard, KernelLock, ObjectCache, Semaphore, SpinMutex,
    SyncError, restore_interrupts,
};

/// Mutex/semaphore timeout meaning "wait forever".
pub const WAIT_FOREVER: u16 = 0xFFFF;

const TICKS_PER_MS: u64 = 10_000;

/// Bytes in front of every [`Osl::allocate`] block; holds the block size.
const ALLOC_HEADER: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OslState {
    Uninitialized,
    Configured,
    Active,
    ShuttingDown,
    Terminated,
}

/// Out-of-band notification from AML.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AcpiSignal<'a> {
    /// `Fatal` opcode.
    Fatal { kind: u32, code: u32, argument: u32 },
    /// `Breakpoint` opcode, with the interpreter's message.
    Breakpoint(&'a str),
}

/// Collects the platform services an [`Osl`] is built on.
#[derive(Default)]
pub struct OslBuilder<'p> {
    context: Option<&'p dyn ExecutionContext>,
    memory: Option<&'p dyn PhysMapper>,
    clock: Option<&'p dyn Clock>,
    interrupts: Option<&'p dyn InterruptRouter>,
    ports: Option<&'p dyn PortIo>,
    pci: Option<&'p dyn PciConfigSpace>,
}

impl<'p> OslBuilder<'p> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn context(mut self, context: &'p dyn ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn memory(mut self, memory: &'p dyn PhysMapper) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: &'p dyn Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn interrupts(mut self, interrupts: &'p dyn InterruptRouter) -> Self {
        self.interrupts = Some(interrupts);
        self
    }

    #[must_use]
    pub fn ports(mut self, ports: &'p dyn PortIo) -> Self {
        self.ports = Some(ports);
        self
    }

    /// Optional; without it PCI configuration callbacks report
    /// [`OslError::NoPciAccess`].
    #[must_use]
    pub fn pci(mut self, pci: &'p dyn PciConfigSpace) -> Self {
        self.pci = Some(pci);
        self
    }

    /// # Errors
    /// [`OslError::MissingCallback`] naming the first missing mandatory service.
    pub fn build(self) -> Result<Osl<'p>, OslError> {
        Ok(Osl {
            ctx: self
                .context
                .ok_or(OslError::MissingCallback("execution context"))?,
            memory: self.memory.ok_or(OslError::MissingCallback("memory mapper"))?,
            clock: self.clock.ok_or(OslError::MissingCallback("clock"))?,
            interrupts: self
                .interrupts
                .ok_or(OslError::MissingCallback("interrupt router"))?,
            ports: self.ports.ok_or(OslError::MissingCallback("port I/O"))?,
            pci: self.pci,
            state: OslState::Uninitialized,
            map: None,
            spinlocks: HandleTable::new(),
            mutexes: HandleTable::new(),
            semaphores: HandleTable::new(),
            caches: HandleTable::new(),
            handlers: SpinMutex::new(Vec::new()),
        })
    }
}

struct InterruptSlot {
    binding: InterruptBinding,
    bound: bool,
}

pub struct Osl<'p> {
    ctx: &'p dyn ExecutionContext,
    memory: &'p dyn PhysMapper,
    clock: &'p dyn Clock,
    interrupts: &'p dyn InterruptRouter,
    ports: &'p dyn PortIo,
    pci: Option<&'p dyn PciConfigSpace>,
    state: OslState,
    map: Option<BootHardwareMap>,
    spinlocks: HandleTable<LockHandle, KernelLock>,
    mutexes: HandleTable<MutexHandle, KernelLock>,
    semaphores: HandleTable<SemaphoreHandle, Semaphore>,
    caches: HandleTable<CacheHandle, ObjectCache>,
    handlers: SpinMutex<Vec<InterruptSlot>>,
}

/// Temporary mapping; unmapped on drop.
struct Mapping<'a> {
    memory: &'a dyn PhysMapper,
    page: NonNull<u8>,
    pages: usize,
    ptr: NonNull<u8>,
}

impl Drop for Mapping<'_> {
    fn drop(&mut self) {
        // Safety: `page`/`pages` come straight from `PhysMapper::map`.
        unsafe { self.memory.unmap(self.page, self.pages) }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn page_offset(addr: u64) -> usize {
    // Always below PAGE_SIZE.
    (addr & (PAGE_SIZE - 1)) as usize
}

#[cold]
fn bugcheck(err: SyncError) -> ! {
    log::error!("BUGCHECK: ACPI synchronization contract violated: {err}");
    panic!("BUGCHECK: {err}");
}

/// Contract violations stop the system; everything else is reported.
fn sync_failure(err: SyncError) -> OslError {
    match err {
        SyncError::Recursive(_) | SyncError::NotOwner { .. } => bugcheck(err),
        other => other.into(),
    }
}

// Lifecycle.
impl Osl<'_> {
    #[must_use]
    pub const fn state(&self) -> OslState {
        self.state
    }

    #[must_use]
    pub const fn boot_map(&self) -> Option<&BootHardwareMap> {
        self.map.as_ref()
    }

    /// Fix the hardware map. The machine width is fixed at build time.
    ///
    /// # Errors
    /// [`OslError::BootMap`] for an invalid map (no RAM region, console
    /// inside RAM, ...), [`OslError::InvalidTransition`] unless
    /// `Uninitialized`.
    pub fn configure(&mut self, map: BootHardwareMap) -> Result<(), OslError> {
        self.expect(OslState::Uninitialized, OslState::Configured)?;
        map.validate()?;
        self.map = Some(map);
        self.enter(OslState::Configured);
        Ok(())
    }

    /// # Errors
    /// [`OslError::InvalidTransition`] unless `Configured`.
    pub fn activate(&mut self) -> Result<(), OslError> {
        self.expect(OslState::Configured, OslState::Active)?;
        if let Some(map) = &self.map {
            log::info!(
                "ACPI services active: {} MiB RAM at {:#x}, {}-bit interpreter ABI",
                map.ram_length / (1024 * 1024),
                map.ram_base,
                MachineWidth::ACTIVE.pointer_bits()
            );
        }
        self.enter(OslState::Active);
        Ok(())
    }

    /// # Errors
    /// [`OslError::InvalidTransition`] unless `Active`.
    pub fn begin_shutdown(&mut self) -> Result<(), OslError> {
        self.expect(OslState::Active, OslState::ShuttingDown)?;
        self.enter(OslState::ShuttingDown);
        Ok(())
    }

    /// Release everything the interpreter left behind.
    ///
    /// # Errors
    /// [`OslError::OutstandingObjects`] while cache objects are still in use;
    /// the façade stays `ShuttingDown` so the interpreter can return them.
    pub fn terminate(&mut self) -> Result<(), OslError> {
        self.expect(OslState::ShuttingDown, OslState::Terminated)?;
        let outstanding = self.outstanding_objects();
        if outstanding > 0 {
            log::warn!("ACPI shutdown blocked by {outstanding} outstanding cache objects");
            return Err(OslError::OutstandingObjects(outstanding));
        }

        for cache in self.caches.drain(self.ctx) {
            if let Err(e) = cache.destroy(self.ctx) {
                log::warn!("cache {}: {e}", cache.name());
            }
        }
        let leftovers = self.spinlocks.drain(self.ctx).len()
            + self.mutexes.drain(self.ctx).len()
            + self.semaphores.drain(self.ctx).len();
        if leftovers > 0 {
            log::debug!("dropping {leftovers} synchronization objects left by the interpreter");
        }
        for slot in self.handlers.lock_irq(self.ctx).drain(..) {
            if slot.bound {
                self.interrupts.unbind(slot.binding.gsi);
            }
        }

        self.enter(OslState::Terminated);
        Ok(())
    }

    fn expect(&self, from: OslState, to: OslState) -> Result<(), OslError> {
        match self.state {
            OslState::Terminated => Err(OslError::Terminated),
            s if s == from => Ok(()),
            s => Err(OslError::InvalidTransition { from: s, to }),
        }
    }

    fn enter(&mut self, to: OslState) {
        log::debug!("ACPI services {:?} -> {to:?}", self.state);
        self.state = to;
    }

    fn live(&self) -> Result<(), OslError> {
        match self.state {
            OslState::Active | OslState::ShuttingDown => Ok(()),
            OslState::Terminated => Err(OslError::Terminated),
            s => Err(OslError::NotActive(s)),
        }
    }
}

// Interpreter callbacks: initialization and tables.
impl Osl<'_> {
    /// `AcpiOsInitialize`.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn os_initialize(&self) -> Result<(), OslError> {
        self.live()
    }

    /// `AcpiOsTerminate`.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn os_terminate(&self) -> Result<(), OslError> {
        self.live()
    }

    /// The RSDP from the boot map, after checking it.
    ///
    /// # Errors
    /// [`OslError::NoRootPointer`] when firmware reported none; the
    /// interpreter then scans the legacy BIOS areas itself.
    /// [`OslError::BadRootPointer`] if the structure does not validate.
    pub fn root_pointer(&self) -> Result<AcpiPhysicalAddress, OslError> {
        self.live()?;
        let root = self
            .map
            .and_then(|m| m.acpi_root)
            .ok_or(OslError::NoRootPointer)?;
        let bytes: [u8; XSDP_LEN] = self.copy_physical(root)?;
        let roots = AcpiRoots::parse(root, &bytes)?;
        log::debug!(
            "RSDP at {root:#x}, revision {}, root table {:?}",
            roots.revision,
            roots.root_table()
        );
        Ok(root)
    }

    /// No predefined object is overridden.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn predefined_override(&self, _name: &str) -> Result<Option<&'static str>, OslError> {
        self.live()?;
        Ok(None)
    }

    /// No table is replaced.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn table_override(&self, _signature: [u8; 4]) -> Result<Option<NonNull<u8>>, OslError> {
        self.live()?;
        Ok(None)
    }

    /// No table is replaced.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn physical_table_override(
        &self,
        _signature: [u8; 4],
    ) -> Result<Option<(AcpiPhysicalAddress, u32)>, OslError> {
        self.live()?;
        Ok(None)
    }
}

// Interpreter callbacks: memory.
impl Osl<'_> {
    /// Map `len` bytes at `phys`. The mapping stays until
    /// [`unmap_memory`](Self::unmap_memory).
    ///
    /// # Errors
    /// [`OslError::MapFailed`] if the mapper refuses, [`OslError::BadParameter`]
    /// for an empty range.
    pub fn map_memory(&self, phys: AcpiPhysicalAddress, len: AcpiSize) -> Result<NonNull<u8>, OslError> {
        self.live()?;
        let mapping = self.map_temporary(phys, u64::from(len))?;
        let ptr = mapping.ptr;
        core::mem::forget(mapping);
        Ok(ptr)
    }

    /// # Safety
    /// `virt` and `len` must match an earlier [`map_memory`](Self::map_memory).
    ///
    /// # Errors
    /// Unless the façade is live.
    pub unsafe fn unmap_memory(&self, virt: NonNull<u8>, len: AcpiSize) -> Result<(), OslError> {
        self.live()?;
        let addr = virt.as_ptr().addr() as u64;
        let ofs = page_offset(addr);
        let Ok(pages) = usize::try_from(pages_spanned(addr, u64::from(len))) else {
            return Err(OslError::BadParameter("mapping length"));
        };
        // Safety: the caller guarantees this is a live mapping.
        unsafe { self.memory.unmap(virt.byte_sub(ofs), pages) };
        Ok(())
    }

    /// # Errors
    /// [`OslError::NotMapped`] if `virt` has no physical backing.
    pub fn physical_address(&self, virt: usize) -> Result<AcpiPhysicalAddress, OslError> {
        self.live()?;
        self.memory.virt_to_phys(virt).ok_or(OslError::NotMapped(virt))
    }

    /// Read `width` bits of physical memory.
    ///
    /// # Safety
    /// The read may hit device registers.
    ///
    /// # Errors
    /// [`OslError::UnsupportedWidth`] unless 8, 16, 32 or 64;
    /// [`OslError::BadParameter`] for unaligned addresses.
    #[allow(clippy::cast_ptr_alignment)]
    pub unsafe fn read_memory(&self, phys: AcpiPhysicalAddress, width: u32) -> Result<u64, OslError> {
        self.live()?;
        let bytes = Self::memory_access(phys, width)?;
        let m = self.map_temporary(phys, bytes)?;
        let p = m.ptr.as_ptr();
        // Safety: mapped, and aligned per `memory_access`.
        let value = unsafe {
            match width {
                8 => u64::from(p.read_volatile()),
                16 => u64::from(p.cast::<u16>().read_volatile()),
                32 => u64::from(p.cast::<u32>().read_volatile()),
                _ => p.cast::<u64>().read_volatile(),
            }
        };
        Ok(value)
    }

    /// Write the low `width` bits of `value` to physical memory.
    ///
    /// # Safety
    /// The write may hit device registers or memory the kernel owns.
    ///
    /// # Errors
    /// As [`read_memory`](Self::read_memory).
    #[allow(clippy::cast_ptr_alignment, clippy::cast_possible_truncation)]
    pub unsafe fn write_memory(
        &self,
        phys: AcpiPhysicalAddress,
        value: u64,
        width: u32,
    ) -> Result<(), OslError> {
        self.live()?;
        let bytes = Self::memory_access(phys, width)?;
        let m = self.map_temporary(phys, bytes)?;
        let p = m.ptr.as_ptr();
        // Safety: mapped, and aligned per `memory_access`.
        unsafe {
            match width {
                8 => p.write_volatile(value as u8),
                16 => p.cast::<u16>().write_volatile(value as u16),
                32 => p.cast::<u32>().write_volatile(value as u32),
                _ => p.cast::<u64>().write_volatile(value),
            }
        }
        Ok(())
    }

    /// Heap allocation, 16-byte aligned.
    ///
    /// # Errors
    /// [`OslError::NoMemory`] if the allocator fails.
    #[allow(clippy::cast_ptr_alignment)]
    pub fn allocate(&self, size: AcpiSize) -> Result<NonNull<u8>, OslError> {
        self.live()?;
        let size = usize::try_from(size).map_err(|_| OslError::NoMemory)?;
        let total = size.checked_add(ALLOC_HEADER).ok_or(OslError::NoMemory)?;
        let layout = Layout::from_size_align(total, ALLOC_HEADER).map_err(|_| OslError::NoMemory)?;
        // Safety: `layout` is never zero-sized.
        let base = NonNull::new(unsafe { alloc(layout) }).ok_or(OslError::NoMemory)?;
        // Safety: the header lies inside the block and is suitably aligned.
        unsafe {
            base.cast::<usize>().write(size);
            Ok(base.add(ALLOC_HEADER))
        }
    }

    /// # Safety
    /// `ptr` must come from [`allocate`](Self::allocate) and not be freed yet.
    ///
    /// # Errors
    /// Unless the façade is live.
    #[allow(clippy::cast_ptr_alignment)]
    pub unsafe fn free(&self, ptr: NonNull<u8>) -> Result<(), OslError> {
        self.live()?;
        // Safety: per the caller, the header precedes `ptr`.
        unsafe {
            let base = ptr.sub(ALLOC_HEADER);
            let size = base.cast::<usize>().read();
            let layout = Layout::from_size_align_unchecked(size + ALLOC_HEADER, ALLOC_HEADER);
            dealloc(base.as_ptr(), layout);
        }
        Ok(())
    }

    fn memory_access(phys: AcpiPhysicalAddress, width: u32) -> Result<u64, OslError> {
        let bytes = match width {
            8 | 16 | 32 | 64 => u64::from(width / 8),
            other => return Err(OslError::UnsupportedWidth(other)),
        };
        if phys % bytes == 0 {
            Ok(bytes)
        } else {
            Err(OslError::BadParameter("unaligned memory access"))
        }
    }

    fn map_temporary(&self, phys: PhysAddr, len: u64) -> Result<Mapping<'_>, OslError> {
        let failed = OslError::MapFailed { phys, len };
        if len == 0 {
            return Err(OslError::BadParameter("empty mapping"));
        }
        if phys.checked_add(len).is_none() {
            return Err(failed);
        }
        let pages = usize::try_from(pages_spanned(phys, len)).map_err(|_| failed)?;
        let base = self.memory.map(page_base(phys), pages).ok_or(failed)?;
        // Safety: the offset lies within the first mapped page.
        let ptr = unsafe { base.add(page_offset(phys)) };
        Ok(Mapping {
            memory: self.memory,
            page: base,
            pages,
            ptr,
        })
    }

    /// Copy `N` bytes of physical memory. Works in any state but `Terminated`.
    pub(crate) fn copy_physical<const N: usize>(&self, phys: PhysAddr) -> Result<[u8; N], OslError> {
        if self.state == OslState::Terminated {
            return Err(OslError::Terminated);
        }
        let m = self.map_temporary(phys, N as u64)?;
        let mut out = [0u8; N];
        // Safety: the mapping covers `N` bytes.
        unsafe { core::ptr::copy_nonoverlapping(m.ptr.as_ptr(), out.as_mut_ptr(), N) };
        Ok(out)
    }
}

// Interpreter callbacks: spin locks, mutexes, semaphores.
impl Osl<'_> {
    /// # Errors
    /// [`OslError::HandlesExhausted`] when no handle is left.
    pub fn create_lock(&self) -> Result<LockHandle, OslError> {
        self.live()?;
        self.spinlocks
            .insert(self.ctx, KernelLock::new())
            .ok_or(OslError::HandlesExhausted)
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    pub fn delete_lock(&self, handle: LockHandle) -> Result<(), OslError> {
        self.live()?;
        let lock = self
            .spinlocks
            .remove(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        if let Some(owner) = lock.owner() {
            log::warn!("spin lock {} deleted while held by {owner:?}", handle.get());
        }
        Ok(())
    }

    /// Mask interrupts and spin until the lock is ours. Returns the saved
    /// interrupt state for [`release_lock`](Self::release_lock).
    ///
    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    ///
    /// # Panics
    /// `BUGCHECK` if the calling context already holds the lock.
    pub fn acquire_lock(&self, handle: LockHandle) -> Result<AcpiCpuFlags, OslError> {
        self.live()?;
        let lock = self
            .spinlocks
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        let irq = IrqGuard::new(self.ctx);
        if let Err(e) = lock.acquire(self.ctx) {
            bugcheck(e);
        }
        Ok(AcpiCpuFlags::from(irq.into_saved()))
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    ///
    /// # Panics
    /// `BUGCHECK` if the calling context does not hold the lock.
    pub fn release_lock(&self, handle: LockHandle, flags: AcpiCpuFlags) -> Result<(), OslError> {
        self.live()?;
        let lock = self
            .spinlocks
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        if let Err(e) = lock.release(self.ctx) {
            bugcheck(e);
        }
        restore_interrupts(self.ctx, flags != 0);
        Ok(())
    }

    /// # Errors
    /// [`OslError::HandlesExhausted`] when no handle is left.
    pub fn create_mutex(&self) -> Result<MutexHandle, OslError> {
        self.live()?;
        self.mutexes
            .insert(self.ctx, KernelLock::new())
            .ok_or(OslError::HandlesExhausted)
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    pub fn delete_mutex(&self, handle: MutexHandle) -> Result<(), OslError> {
        self.live()?;
        let lock = self
            .mutexes
            .remove(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        if let Some(owner) = lock.owner() {
            log::warn!("mutex {} deleted while held by {owner:?}", handle.get());
        }
        Ok(())
    }

    /// Acquire with a timeout in milliseconds: `0` tries once,
    /// [`WAIT_FOREVER`] blocks, anything else polls against the clock.
    ///
    /// # Errors
    /// [`OslError::Timeout`], [`OslError::InvalidHandle`].
    ///
    /// # Panics
    /// `BUGCHECK` on recursive acquisition.
    pub fn acquire_mutex(&self, handle: MutexHandle, timeout_ms: u16) -> Result<(), OslError> {
        self.live()?;
        let lock = self
            .mutexes
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        let acquired = match timeout_ms {
            WAIT_FOREVER => lock.acquire(self.ctx).map(|()| true),
            0 => lock.try_acquire(self.ctx),
            ms => self.poll(ms, || lock.try_acquire(self.ctx)),
        };
        if acquired.map_err(sync_failure)? {
            Ok(())
        } else {
            Err(OslError::Timeout)
        }
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    ///
    /// # Panics
    /// `BUGCHECK` if the calling context does not own the mutex.
    pub fn release_mutex(&self, handle: MutexHandle) -> Result<(), OslError> {
        self.live()?;
        let lock = self
            .mutexes
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        lock.release(self.ctx).map_err(sync_failure)
    }

    /// # Errors
    /// [`OslError::Sync`] if `initial > max`.
    pub fn create_semaphore(&self, max: u32, initial: u32) -> Result<SemaphoreHandle, OslError> {
        self.live()?;
        let sem = Semaphore::new(initial, max)?;
        self.semaphores
            .insert(self.ctx, sem)
            .ok_or(OslError::HandlesExhausted)
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    pub fn delete_semaphore(&self, handle: SemaphoreHandle) -> Result<(), OslError> {
        self.live()?;
        self.semaphores
            .remove(self.ctx, handle)
            .map(drop)
            .ok_or(OslError::InvalidHandle)
    }

    /// Take `units`, with the same timeout rules as
    /// [`acquire_mutex`](Self::acquire_mutex).
    ///
    /// # Errors
    /// [`OslError::Timeout`], [`OslError::InvalidHandle`], or
    /// [`OslError::Sync`] when `units` exceeds the maximum.
    pub fn wait_semaphore(&self, handle: SemaphoreHandle, units: u32, timeout_ms: u16) -> Result<(), OslError> {
        self.live()?;
        let sem = self
            .semaphores
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        let acquired = match timeout_ms {
            WAIT_FOREVER => sem.wait(self.ctx, units).map(|()| true),
            0 => sem.try_wait(units),
            ms => self.poll(ms, || sem.try_wait(units)),
        };
        if acquired.map_err(sync_failure)? {
            Ok(())
        } else {
            Err(OslError::Timeout)
        }
    }

    /// # Errors
    /// [`OslError::Sync`] if the count would exceed the maximum.
    pub fn signal_semaphore(&self, handle: SemaphoreHandle, units: u32) -> Result<(), OslError> {
        self.live()?;
        let sem = self
            .semaphores
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        sem.signal(units).map_err(sync_failure)
    }

    fn poll(
        &self,
        timeout_ms: u16,
        mut attempt: impl FnMut() -> Result<bool, SyncError>,
    ) -> Result<bool, SyncError> {
        let deadline = self
            .clock
            .ticks_100ns()
            .saturating_add(u64::from(timeout_ms) * TICKS_PER_MS);
        loop {
            if attempt()? {
                return Ok(true);
            }
            if self.clock.ticks_100ns() >= deadline {
                return Ok(false);
            }
            if self.ctx.may_block() {
                self.ctx.yield_now();
            } else {
                core::hint::spin_loop();
            }
        }
    }
}

// Interpreter callbacks: object caches.
impl Osl<'_> {
    /// # Errors
    /// [`OslError::Cache`] for a zero size or depth.
    pub fn create_cache(&self, name: &'static str, object_size: usize, max_depth: usize) -> Result<CacheHandle, OslError> {
        self.live()?;
        let cache = ObjectCache::new(name, object_size, max_depth)?;
        self.caches
            .insert(self.ctx, cache)
            .ok_or(OslError::HandlesExhausted)
    }

    /// Destroy a cache. Objects still in use are leaked and reported.
    ///
    /// # Errors
    /// [`OslError::Cache`] with [`CacheError::Leaked`](kernel_sync::CacheError::Leaked)
    /// if objects were outstanding; the handle is gone either way.
    pub fn delete_cache(&self, handle: CacheHandle) -> Result<(), OslError> {
        self.live()?;
        let cache = self
            .caches
            .remove(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        cache.destroy(self.ctx)?;
        Ok(())
    }

    /// Give idle objects back to the heap; returns how many.
    ///
    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    pub fn purge_cache(&self, handle: CacheHandle) -> Result<usize, OslError> {
        self.live()?;
        let cache = self
            .caches
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        Ok(cache.purge(self.ctx))
    }

    /// A zeroed object.
    ///
    /// # Errors
    /// [`OslError::Cache`] when exhausted or out of memory.
    pub fn acquire_object(&self, handle: CacheHandle) -> Result<NonNull<u8>, OslError> {
        self.live()?;
        let cache = self
            .caches
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        Ok(cache.acquire(self.ctx)?)
    }

    /// # Errors
    /// [`OslError::Cache`] for foreign or already released objects.
    pub fn release_object(&self, handle: CacheHandle, object: NonNull<u8>) -> Result<(), OslError> {
        self.live()?;
        let cache = self
            .caches
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        Ok(cache.release(self.ctx, object)?)
    }

    /// # Errors
    /// [`OslError::InvalidHandle`] for unknown handles.
    pub fn cache_stats(&self, handle: CacheHandle) -> Result<CacheStats, OslError> {
        self.live()?;
        let cache = self
            .caches
            .get(self.ctx, handle)
            .ok_or(OslError::InvalidHandle)?;
        Ok(cache.stats(self.ctx))
    }

    /// Objects handed out by all caches and not yet released.
    #[must_use]
    pub fn outstanding_objects(&self) -> usize {
        self.caches
            .snapshot(self.ctx)
            .iter()
            .map(|c| c.stats(self.ctx).in_use)
            .sum()
    }
}

// Interpreter callbacks: time, threads, interrupts.
impl Osl<'_> {
    /// # Errors
    /// Unless the façade is live.
    pub fn stall(&self, us: u32) -> Result<(), OslError> {
        self.live()?;
        self.clock.stall_us(us);
        Ok(())
    }

    /// # Errors
    /// Unless the façade is live.
    pub fn sleep(&self, ms: u64) -> Result<(), OslError> {
        self.live()?;
        self.clock.sleep_ms(ms);
        Ok(())
    }

    /// Monotonic time in 100 ns units.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn timer(&self) -> Result<u64, OslError> {
        self.live()?;
        Ok(self.clock.ticks_100ns())
    }

    /// Non-zero identity of the calling context.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn thread_id(&self) -> Result<AcpiThreadId, OslError> {
        self.live()?;
        Ok(self.ctx.current().get() as AcpiThreadId)
    }

    /// Register `handler` on `gsi`. Bound immediately if the interrupt
    /// controller is up, otherwise kept until
    /// [`bind_deferred_interrupts`](Self::bind_deferred_interrupts).
    ///
    /// # Errors
    /// [`OslError::HandlerExists`] if `gsi` already has a handler,
    /// [`OslError::InterruptUnavailable`] if the router rejects the line.
    pub fn install_interrupt_handler(
        &self,
        gsi: u32,
        handler: InterruptServiceRoutine,
        context: usize,
    ) -> Result<(), OslError> {
        self.live()?;
        let binding = InterruptBinding {
            gsi,
            handler,
            context,
        };
        let mut slots = self.handlers.lock_irq(self.ctx);
        if slots.iter().any(|s| s.binding.gsi == gsi) {
            return Err(OslError::HandlerExists(gsi));
        }
        let bound = if self.interrupts.is_ready() {
            if !self.interrupts.bind(binding) {
                return Err(OslError::InterruptUnavailable(gsi));
            }
            true
        } else {
            log::debug!("deferring handler for GSI {gsi} until the interrupt controller is up");
            false
        };
        slots.push(InterruptSlot { binding, bound });
        Ok(())
    }

    /// # Errors
    /// [`OslError::NoHandler`] unless `handler` is installed on `gsi`.
    pub fn remove_interrupt_handler(&self, gsi: u32, handler: InterruptServiceRoutine) -> Result<(), OslError> {
        self.live()?;
        let mut slots = self.handlers.lock_irq(self.ctx);
        let index = slots
            .iter()
            .position(|s| s.binding.gsi == gsi && s.binding.is_handler(handler))
            .ok_or(OslError::NoHandler(gsi))?;
        let slot = slots.remove(index);
        if slot.bound {
            self.interrupts.unbind(gsi);
        }
        Ok(())
    }

    /// Bind handlers installed before the interrupt controller was ready.
    /// Returns how many were bound; lines the router rejects stay pending.
    ///
    /// # Errors
    /// [`OslError::RouterNotReady`] if the controller is still down.
    pub fn bind_deferred_interrupts(&self) -> Result<usize, OslError> {
        self.live()?;
        if !self.interrupts.is_ready() {
            return Err(OslError::RouterNotReady);
        }
        let mut bound = 0;
        for slot in self.handlers.lock_irq(self.ctx).iter_mut().filter(|s| !s.bound) {
            if self.interrupts.bind(slot.binding) {
                slot.bound = true;
                bound += 1;
            } else {
                log::warn!("GSI {} still cannot be routed", slot.binding.gsi);
            }
        }
        Ok(bound)
    }

    /// Installed handlers not yet bound to the controller.
    #[must_use]
    pub fn pending_interrupts(&self) -> usize {
        self.handlers
            .lock_irq(self.ctx)
            .iter()
            .filter(|s| !s.bound)
            .count()
    }
}

// Interpreter callbacks: I/O ports and PCI configuration space.
impl Osl<'_> {
    /// # Safety
    /// Port reads can have side effects on hardware.
    ///
    /// # Errors
    /// [`OslError::UnsupportedWidth`] unless 8, 16 or 32;
    /// [`OslError::MisalignedPort`]; [`OslError::BadParameter`] past `0xFFFF`.
    pub unsafe fn read_port(&self, port: AcpiIoAddress, width: u32) -> Result<u32, OslError> {
        self.live()?;
        let (port, access) = Self::port_access(port, width)?;
        // Safety: forwarded to the caller.
        let value = unsafe { self.ports.read(port, access) };
        log::trace!("read port {port:#x} ({width} bits) = {value:#x}");
        Ok(value)
    }

    /// # Safety
    /// Port writes reconfigure hardware.
    ///
    /// # Errors
    /// As [`read_port`](Self::read_port).
    pub unsafe fn write_port(&self, port: AcpiIoAddress, value: u32, width: u32) -> Result<(), OslError> {
        self.live()?;
        let (port, access) = Self::port_access(port, width)?;
        log::trace!("write port {port:#x} ({width} bits) = {value:#x}");
        // Safety: forwarded to the caller.
        unsafe { self.ports.write(port, access, value & access.mask()) };
        Ok(())
    }

    fn port_access(port: AcpiIoAddress, width: u32) -> Result<(u16, PortWidth), OslError> {
        let access = PortWidth::from_bits(width).ok_or(OslError::UnsupportedWidth(width))?;
        let wide = u64::from(port);
        let port = u16::try_from(wide).map_err(|_| OslError::BadParameter("port out of range"))?;
        if port % access.bytes() != 0 {
            return Err(OslError::MisalignedPort { port: wide, width });
        }
        Ok((port, access))
    }

    /// Read `width` bits of a function's configuration space.
    ///
    /// # Safety
    /// Configuration reads can have side effects on devices.
    ///
    /// # Errors
    /// [`OslError::NoPciAccess`] without a PCI service,
    /// [`OslError::UnsupportedWidth`], or [`OslError::BadParameter`] for
    /// unaligned or unreachable registers.
    pub unsafe fn read_pci_configuration(&self, id: AcpiPciId, register: u32, width: u32) -> Result<u64, OslError> {
        self.live()?;
        let (pci, register) = self.pci_access(id, register, width)?;
        let dword = register & !3;
        let shift = u32::from(register & 3) * 8;
        // Safety: `pci_access` checked reachability and alignment.
        let value = unsafe {
            if width == 64 {
                u64::from(pci.read32(id, dword)) | (u64::from(pci.read32(id, dword + 4)) << 32)
            } else {
                let mask = (1u64 << width) - 1;
                (u64::from(pci.read32(id, dword)) >> shift) & mask
            }
        };
        Ok(value)
    }

    /// Write `width` bits of a function's configuration space. Sub-dword
    /// writes are read-modify-write of the containing dword.
    ///
    /// # Safety
    /// Configuration writes reconfigure devices.
    ///
    /// # Errors
    /// As [`read_pci_configuration`](Self::read_pci_configuration).
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn write_pci_configuration(
        &self,
        id: AcpiPciId,
        register: u32,
        value: u64,
        width: u32,
    ) -> Result<(), OslError> {
        self.live()?;
        let (pci, register) = self.pci_access(id, register, width)?;
        let dword = register & !3;
        let shift = u32::from(register & 3) * 8;
        // Safety: `pci_access` checked reachability and alignment.
        unsafe {
            match width {
                64 => {
                    pci.write32(id, dword, value as u32);
                    pci.write32(id, dword + 4, (value >> 32) as u32);
                }
                32 => pci.write32(id, dword, value as u32),
                _ => {
                    let mask = ((1u32 << width) - 1) << shift;
                    let old = pci.read32(id, dword);
                    let new = (old & !mask) | (((value as u32) << shift) & mask);
                    pci.write32(id, dword, new);
                }
            }
        }
        Ok(())
    }

    fn pci_access(
        &self,
        id: AcpiPciId,
        register: u32,
        width: u32,
    ) -> Result<(&dyn PciConfigSpace, u16), OslError> {
        let pci = self.pci.ok_or(OslError::NoPciAccess)?;
        let bytes: u16 = match width {
            8 => 1,
            16 => 2,
            32 => 4,
            64 => 8,
            other => return Err(OslError::UnsupportedWidth(other)),
        };
        let register =
            u16::try_from(register).map_err(|_| OslError::BadParameter("PCI register out of range"))?;
        if register % bytes != 0 {
            return Err(OslError::BadParameter("unaligned PCI access"));
        }
        let last = register
            .checked_add(bytes - 1)
            .ok_or(OslError::BadParameter("PCI register out of range"))?;
        if !pci.supports(id, register) || !pci.supports(id, last) {
            return Err(OslError::BadParameter("PCI function or register unreachable"));
        }
        Ok((pci, register))
    }
}

// Interpreter callbacks: output.
impl Osl<'_> {
    /// Variadic entry: capture `args` and forward to [`vprintf`](Self::vprintf).
    /// Usually called through [`acpi_printf!`](crate::acpi_printf).
    ///
    /// # Errors
    /// [`OslError::Terminated`] only; formatting problems never fail.
    pub fn printf(&self, template: &str, args: &[FormatArg<'_>]) -> Result<(), OslError> {
        self.vprintf(template, &mut SliceArgs::new(args))
    }

    /// Argument-list entry. Takes no interpreter lock, so it is safe to call
    /// while holding any of them.
    ///
    /// # Errors
    /// [`OslError::Terminated`] only; formatting problems never fail.
    pub fn vprintf(&self, template: &str, args: &mut dyn ArgList<'_>) -> Result<(), OslError> {
        if self.state == OslState::Terminated {
            return Err(OslError::Terminated);
        }
        let rendered = printf::render(template, args, &mut LogSink);
        if rendered.truncated {
            log::trace!(target: "acpica", "message cut short: missing arguments");
        }
        Ok(())
    }

    /// Out-of-band notification from AML.
    ///
    /// # Errors
    /// Unless the façade is live.
    pub fn signal(&self, signal: AcpiSignal<'_>) -> Result<(), OslError> {
        self.live()?;
        match signal {
            AcpiSignal::Fatal {
                kind,
                code,
                argument,
            } => log::error!(
                "AML fatal: type {kind:#x} code {code:#x} argument {argument:#x}"
            ),
            AcpiSignal::Breakpoint(message) => log::warn!("AML breakpoint: {message}"),
        }
        Ok(())
    }
}

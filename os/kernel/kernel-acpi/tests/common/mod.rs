#![allow(dead_code)]

use kernel_acpi::{
    Clock, InterruptBinding, InterruptRouter, Osl, OslBuilder, PciConfigSpace, PhysMapper,
    PortIo, PortWidth,
};
use kernel_info::hwmap::{BootHardwareMap, PhysAddr, PlatformProfile};
use kernel_info::memory::PAGE_SIZE;
use kernel_info::width::AcpiPciId;
use kernel_sync::{ContextId, ExecutionContext};
use std::cell::Cell;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static ID: ContextId = ContextId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)).unwrap();
    static INTERRUPTS: Cell<bool> = const { Cell::new(true) };
}

/// One context per OS thread; interrupts are a thread-local flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadContext;

impl ExecutionContext for ThreadContext {
    fn current(&self) -> ContextId {
        ID.with(|id| *id)
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn may_block(&self) -> bool {
        INTERRUPTS.with(Cell::get)
    }

    fn interrupts_enabled(&self) -> bool {
        INTERRUPTS.with(Cell::get)
    }

    fn set_interrupts(&self, enabled: bool) {
        INTERRUPTS.with(|c| c.set(enabled));
    }
}

pub fn interrupts_enabled() -> bool {
    INTERRUPTS.with(Cell::get)
}

/// Physical memory backed by a leaked heap buffer; physical address 0 is
/// its first byte.
pub struct FakeMemory {
    base: NonNull<u8>,
    len: u64,
    mapped_pages: AtomicUsize,
    maps: AtomicUsize,
}

// The buffer is leaked and only touched through raw pointers.
unsafe impl Send for FakeMemory {}
unsafe impl Sync for FakeMemory {}

impl FakeMemory {
    pub fn new(pages: usize) -> Self {
        let words = pages * 4096 / 8;
        let buf: &'static mut [u64] = vec![0u64; words].leak();
        Self {
            base: NonNull::new(buf.as_mut_ptr().cast::<u8>()).unwrap(),
            len: (pages * 4096) as u64,
            mapped_pages: AtomicUsize::new(0),
            maps: AtomicUsize::new(0),
        }
    }

    pub fn write(&self, phys: PhysAddr, bytes: &[u8]) {
        assert!(phys + bytes.len() as u64 <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.base.as_ptr().add(phys as usize),
                bytes.len(),
            );
        }
    }

    pub fn read(&self, phys: PhysAddr, len: usize) -> Vec<u8> {
        assert!(phys + len as u64 <= self.len);
        let mut out = vec![0; len];
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.base.as_ptr().add(phys as usize),
                out.as_mut_ptr(),
                len,
            );
        }
        out
    }

    /// Pages currently mapped.
    pub fn mapped_pages(&self) -> usize {
        self.mapped_pages.load(Ordering::SeqCst)
    }

    /// Calls to `map` so far.
    pub fn maps(&self) -> usize {
        self.maps.load(Ordering::SeqCst)
    }

    pub fn virt_of(&self, phys: PhysAddr) -> usize {
        self.base.as_ptr() as usize + phys as usize
    }
}

impl PhysMapper for FakeMemory {
    fn map(&self, phys_page: PhysAddr, pages: usize) -> Option<NonNull<u8>> {
        assert_eq!(phys_page % PAGE_SIZE, 0, "mapping must start on a page");
        if phys_page + (pages as u64) * PAGE_SIZE > self.len {
            return None;
        }
        self.maps.fetch_add(1, Ordering::SeqCst);
        self.mapped_pages.fetch_add(pages, Ordering::SeqCst);
        Some(unsafe { self.base.add(phys_page as usize) })
    }

    unsafe fn unmap(&self, virt_page: NonNull<u8>, pages: usize) {
        let offset = virt_page.as_ptr() as usize - self.base.as_ptr() as usize;
        assert_eq!(offset as u64 % PAGE_SIZE, 0, "unmap must start on a page");
        self.mapped_pages.fetch_sub(pages, Ordering::SeqCst);
    }

    fn virt_to_phys(&self, virt: usize) -> Option<PhysAddr> {
        let offset = virt.checked_sub(self.base.as_ptr() as usize)? as u64;
        (offset < self.len).then_some(offset)
    }
}

/// Every read advances time by `step` ticks so polling loops terminate.
pub struct FakeClock {
    ticks: AtomicU64,
    step: u64,
    pub stalled_us: AtomicU64,
    pub slept_ms: AtomicU64,
}

impl FakeClock {
    pub const fn new(step: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            step,
            stalled_us: AtomicU64::new(0),
            slept_ms: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Clock for FakeClock {
    fn ticks_100ns(&self) -> u64 {
        self.ticks.fetch_add(self.step, Ordering::SeqCst) + self.step
    }

    fn stall_us(&self, us: u32) {
        self.stalled_us.fetch_add(u64::from(us), Ordering::SeqCst);
        self.ticks.fetch_add(u64::from(us) * 10, Ordering::SeqCst);
    }

    fn sleep_ms(&self, ms: u64) {
        self.slept_ms.fetch_add(ms, Ordering::SeqCst);
        self.ticks.fetch_add(ms * 10_000, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeRouter {
    pub ready: AtomicBool,
    pub bound: Mutex<Vec<InterruptBinding>>,
    pub refused: Mutex<Vec<u32>>,
}

impl FakeRouter {
    pub fn ready() -> Self {
        let r = Self::default();
        r.ready.store(true, Ordering::SeqCst);
        r
    }

    pub fn bound_gsis(&self) -> Vec<u32> {
        self.bound.lock().unwrap().iter().map(|b| b.gsi).collect()
    }
}

impl InterruptRouter for FakeRouter {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn bind(&self, binding: InterruptBinding) -> bool {
        if self.refused.lock().unwrap().contains(&binding.gsi) {
            return false;
        }
        self.bound.lock().unwrap().push(binding);
        true
    }

    fn unbind(&self, gsi: u32) {
        self.bound.lock().unwrap().retain(|b| b.gsi != gsi);
    }
}

/// Port space as a register file; records every access.
#[derive(Default)]
pub struct FakePorts {
    pub registers: Mutex<HashMap<u16, u32>>,
    pub writes: Mutex<Vec<(u16, PortWidth, u32)>>,
    pub reads: Mutex<Vec<(u16, PortWidth)>>,
}

impl PortIo for FakePorts {
    unsafe fn read(&self, port: u16, width: PortWidth) -> u32 {
        self.reads.lock().unwrap().push((port, width));
        self.registers.lock().unwrap().get(&port).copied().unwrap_or(0) & width.mask()
    }

    unsafe fn write(&self, port: u16, width: PortWidth, value: u32) {
        self.writes.lock().unwrap().push((port, width, value));
        self.registers.lock().unwrap().insert(port, value & width.mask());
    }
}

/// Configuration space of segment 0, 256 bytes per function.
#[derive(Default)]
pub struct FakePci {
    pub dwords: Mutex<HashMap<(u16, u16, u16, u16), u32>>,
}

impl FakePci {
    pub fn set(&self, id: AcpiPciId, register: u16, value: u32) {
        self.dwords
            .lock()
            .unwrap()
            .insert((id.bus, id.device, id.function, register), value);
    }

    pub fn get(&self, id: AcpiPciId, register: u16) -> u32 {
        self.dwords
            .lock()
            .unwrap()
            .get(&(id.bus, id.device, id.function, register))
            .copied()
            .unwrap_or(u32::MAX)
    }
}

impl PciConfigSpace for FakePci {
    fn supports(&self, id: AcpiPciId, register: u16) -> bool {
        id.segment == 0 && register < 256
    }

    unsafe fn read32(&self, id: AcpiPciId, register: u16) -> u32 {
        assert_eq!(register % 4, 0);
        self.get(id, register)
    }

    unsafe fn write32(&self, id: AcpiPciId, register: u16, value: u32) {
        assert_eq!(register % 4, 0);
        self.set(id, register, value);
    }
}

/// Everything an [`Osl`] borrows.
pub struct Platform {
    pub ctx: ThreadContext,
    pub memory: FakeMemory,
    pub clock: FakeClock,
    pub router: FakeRouter,
    pub ports: FakePorts,
    pub pci: FakePci,
}

impl Platform {
    /// 64 pages of memory, a clock advancing 1 ms per read, a ready router.
    pub fn new() -> Self {
        Self {
            ctx: ThreadContext,
            memory: FakeMemory::new(64),
            clock: FakeClock::new(10_000),
            router: FakeRouter::ready(),
            ports: FakePorts::default(),
            pci: FakePci::default(),
        }
    }

    pub fn builder(&self) -> OslBuilder<'_> {
        OslBuilder::new()
            .context(&self.ctx)
            .memory(&self.memory)
            .clock(&self.clock)
            .interrupts(&self.router)
            .ports(&self.ports)
            .pci(&self.pci)
    }

    /// A façade configured for the PC profile and activated.
    pub fn active(&self) -> Osl<'_> {
        self.active_with(pc_map(None))
    }

    pub fn active_with(&self, map: BootHardwareMap) -> Osl<'_> {
        let mut osl = self.builder().build().unwrap();
        osl.configure(map).unwrap();
        osl.activate().unwrap();
        osl
    }
}

/// PC profile with an optional RSDP address.
pub fn pc_map(acpi_root: Option<PhysAddr>) -> BootHardwareMap {
    BootHardwareMap {
        acpi_root,
        ..PlatformProfile::Pc.hardware_map()
    }
}

fn checksum(bytes: &mut [u8], at: usize) {
    bytes[at] = 0;
    let sum = bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b));
    bytes[at] = 0u8.wrapping_sub(sum);
}

/// A valid ACPI 2.0 XSDP.
pub fn xsdp(xsdt: u64) -> [u8; 36] {
    let mut b = [0u8; 36];
    b[0..8].copy_from_slice(b"RSD PTR ");
    b[9..15].copy_from_slice(b"RUSTOS");
    b[15] = 2;
    b[16..20].copy_from_slice(&0x000F_1000u32.to_le_bytes());
    b[20..24].copy_from_slice(&36u32.to_le_bytes());
    b[24..32].copy_from_slice(&xsdt.to_le_bytes());
    checksum(&mut b[..20], 8);
    checksum(&mut b, 32);
    b
}

/// A minimal flattened device tree header.
pub fn fdt_header(total_size: u32) -> [u8; 40] {
    let fields = [0xd00d_feed, total_size, 0x38, 0x48, 0x28, 17, 16, 0, 0x10, 0x10];
    let mut b = [0u8; 40];
    for (i, f) in fields.iter().enumerate() {
        b[i * 4..i * 4 + 4].copy_from_slice(&f.to_be_bytes());
    }
    b
}

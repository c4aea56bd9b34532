mod common;

use common::{Platform, fdt_header, pc_map, xsdp};
use kernel_acpi::devtree::DeviceTreeError;
use kernel_acpi::{
    AcpiStatus, BringUp, BringUpError, CacheHandle, Interpreter, Osl, OslError, OslState,
    bring_up, shut_down, status,
};
use kernel_info::hwmap::{BlobRange, BootHardwareMap};

#[derive(Default)]
struct Recorder {
    calls: Vec<&'static str>,
    fail: Option<(&'static str, AcpiStatus)>,
    keep_object: bool,
    cache: Option<CacheHandle>,
    root: Option<u64>,
}

impl Recorder {
    fn step(&mut self, name: &'static str) -> AcpiStatus {
        self.calls.push(name);
        match self.fail {
            Some((at, status)) if at == name => status,
            _ => status::AE_OK,
        }
    }
}

impl Interpreter for Recorder {
    fn initialize_subsystem(&mut self, osl: &Osl<'_>) -> AcpiStatus {
        if let Err(e) = osl.os_initialize() {
            return e.status();
        }
        self.cache = osl.create_cache("Acpi-Namespace", 40, 8).ok();
        self.step("subsystem")
    }

    fn initialize_tables(&mut self, osl: &Osl<'_>) -> AcpiStatus {
        self.root = osl.root_pointer().ok();
        self.step("tables")
    }

    fn load_tables(&mut self, osl: &Osl<'_>) -> AcpiStatus {
        if let Some(cache) = self.cache {
            let object = osl.acquire_object(cache).unwrap();
            if !self.keep_object {
                osl.release_object(cache, object).unwrap();
            }
        }
        self.step("load")
    }

    fn enable_subsystem(&mut self, _osl: &Osl<'_>) -> AcpiStatus {
        self.step("enable")
    }

    fn terminate(&mut self, osl: &Osl<'_>) -> AcpiStatus {
        if let Err(e) = osl.os_terminate() {
            return e.status();
        }
        self.step("terminate")
    }
}

fn dt_map(blob: BlobRange) -> BootHardwareMap {
    BootHardwareMap {
        ram_base: 0x4000_0000,
        ram_length: 128 * 1024 * 1024,
        console_base: Some(0x0900_0000),
        hw_description_blob: Some(blob),
        acpi_root: None,
    }
}

#[test]
fn acpi_platform_runs_every_stage_in_order() {
    let p = Platform::new();
    p.memory.write(0x2000, &xsdp(0x7FE1_4000));
    let mut osl = p.builder().build().unwrap();
    let mut interp = Recorder::default();

    let how = bring_up(&mut osl, pc_map(Some(0x2000)), &mut interp).unwrap();
    assert_eq!(how, BringUp::Acpi);
    assert_eq!(osl.state(), OslState::Active);
    assert_eq!(interp.calls, ["subsystem", "tables", "load", "enable"]);
    assert_eq!(interp.root, Some(0x2000));

    shut_down(&mut osl, &mut interp).unwrap();
    assert_eq!(osl.state(), OslState::Terminated);
    assert_eq!(interp.calls.last(), Some(&"terminate"));
}

#[test]
fn first_failing_stage_stops_bring_up() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();
    let mut interp = Recorder {
        fail: Some(("load", status::AE_NO_ACPI_TABLES)),
        ..Recorder::default()
    };

    let err = bring_up(&mut osl, pc_map(None), &mut interp).unwrap_err();
    assert_eq!(
        err,
        BringUpError::Interpreter {
            stage: "load tables",
            status: status::AE_NO_ACPI_TABLES
        }
    );
    assert_eq!(interp.calls, ["subsystem", "tables", "load"]);
    assert_eq!(interp.root, None);
}

#[test]
fn shutdown_reports_leaked_objects() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();
    let mut interp = Recorder {
        keep_object: true,
        ..Recorder::default()
    };

    bring_up(&mut osl, pc_map(None), &mut interp).unwrap();
    assert_eq!(
        shut_down(&mut osl, &mut interp),
        Err(BringUpError::Osl(OslError::OutstandingObjects(1)))
    );
    assert_eq!(osl.state(), OslState::ShuttingDown);
}

#[test]
fn device_tree_platform_skips_the_interpreter() {
    let p = Platform::new();
    p.memory.write(0x8000, &fdt_header(0x800));
    let mut osl = p.builder().build().unwrap();
    let mut interp = Recorder::default();

    let how = bring_up(&mut osl, dt_map(BlobRange::new(0x8000, 0x9000)), &mut interp).unwrap();
    let BringUp::DeviceTree(header) = how else {
        panic!("expected a device tree bring-up, got {how:?}");
    };
    assert_eq!(header.total_size, 0x800);
    assert_eq!(header.version, 17);
    assert!(interp.calls.is_empty());
    assert_eq!(osl.state(), OslState::Configured);
    assert_eq!(p.memory.mapped_pages(), 0);
}

#[test]
fn malformed_device_trees_are_rejected() {
    let p = Platform::new();
    let blob = BlobRange::new(0x8000, 0x9000);

    let mut osl = p.builder().build().unwrap();
    assert_eq!(
        bring_up(&mut osl, dt_map(blob), &mut Recorder::default()),
        Err(BringUpError::DeviceTree(DeviceTreeError::BadMagic(0)))
    );

    p.memory.write(0x8000, &fdt_header(0x2000));
    let mut osl = p.builder().build().unwrap();
    assert_eq!(
        bring_up(&mut osl, dt_map(blob), &mut Recorder::default()),
        Err(BringUpError::DeviceTree(DeviceTreeError::BadSize {
            total_size: 0x2000,
            available: 0x1000
        }))
    );
}

#[test]
fn invalid_map_never_reaches_the_interpreter() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();
    let mut interp = Recorder::default();
    let map = BootHardwareMap {
        console_base: Some(0x0010_0000),
        ..pc_map(None)
    };
    assert!(matches!(
        bring_up(&mut osl, map, &mut interp),
        Err(BringUpError::Osl(OslError::BootMap(_)))
    ));
    assert!(interp.calls.is_empty());
}

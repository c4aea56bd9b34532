mod common;

use common::{Platform, pc_map};
use kernel_acpi::{OslBuilder, OslError, OslState, status};
use kernel_info::hwmap::{BootHardwareMap, BootMapError, PlatformProfile};

#[test]
fn builder_names_the_missing_service() {
    let p = Platform::new();
    let err = OslBuilder::new()
        .context(&p.ctx)
        .memory(&p.memory)
        .interrupts(&p.router)
        .ports(&p.ports)
        .build()
        .err();
    assert_eq!(err, Some(OslError::MissingCallback("clock")));
    assert_eq!(err.unwrap().status(), status::AE_NOT_CONFIGURED);
}

#[test]
fn pci_service_is_optional() {
    let p = Platform::new();
    let osl = OslBuilder::new()
        .context(&p.ctx)
        .memory(&p.memory)
        .clock(&p.clock)
        .interrupts(&p.router)
        .ports(&p.ports)
        .build()
        .unwrap();
    assert_eq!(osl.state(), OslState::Uninitialized);
}

#[test]
fn walks_the_lifecycle_forward_only() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();

    assert_eq!(
        osl.activate(),
        Err(OslError::InvalidTransition {
            from: OslState::Uninitialized,
            to: OslState::Active
        })
    );

    osl.configure(pc_map(None)).unwrap();
    assert_eq!(osl.state(), OslState::Configured);
    assert_eq!(osl.boot_map().map(|m| m.ram_length), Some(128 * 1024 * 1024));
    assert!(matches!(
        osl.configure(pc_map(None)),
        Err(OslError::InvalidTransition { .. })
    ));

    osl.activate().unwrap();
    osl.begin_shutdown().unwrap();
    osl.terminate().unwrap();
    assert_eq!(osl.state(), OslState::Terminated);

    assert_eq!(osl.activate(), Err(OslError::Terminated));
    assert_eq!(osl.terminate(), Err(OslError::Terminated));
}

#[test]
fn callbacks_need_an_active_facade() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();
    assert_eq!(
        osl.create_lock().err(),
        Some(OslError::NotActive(OslState::Uninitialized))
    );
    osl.configure(pc_map(None)).unwrap();
    assert_eq!(
        osl.os_initialize(),
        Err(OslError::NotActive(OslState::Configured))
    );
    osl.activate().unwrap();
    osl.os_initialize().unwrap();
    osl.os_terminate().unwrap();
}

#[test]
fn invalid_boot_map_is_rejected() {
    let p = Platform::new();
    let mut osl = p.builder().build().unwrap();
    let map = BootHardwareMap {
        ram_length: 0,
        ..PlatformProfile::Pc.hardware_map()
    };
    let err = osl.configure(map).unwrap_err();
    assert_eq!(err, OslError::BootMap(BootMapError::NoRamRegion));
    assert_eq!(err.status(), status::AE_BAD_DATA);
    assert_eq!(osl.state(), OslState::Uninitialized);
}

#[test]
fn shutdown_waits_for_outstanding_cache_objects() {
    let p = Platform::new();
    let mut osl = p.active_with(PlatformProfile::Pc.hardware_map());

    let lock = osl.create_lock().unwrap();
    let flags = osl.acquire_lock(lock).unwrap();
    osl.release_lock(lock, flags).unwrap();

    let cache = osl.create_cache("Acpi-Operand", 72, 16).unwrap();
    let object = osl.acquire_object(cache).unwrap();
    assert_eq!(osl.outstanding_objects(), 1);

    osl.begin_shutdown().unwrap();
    let err = osl.terminate().unwrap_err();
    assert_eq!(err, OslError::OutstandingObjects(1));
    assert_eq!(osl.state(), OslState::ShuttingDown);

    // Still serving callbacks while shutting down.
    osl.release_object(cache, object).unwrap();
    osl.terminate().unwrap();

    assert_eq!(osl.create_lock().err(), Some(OslError::Terminated));
    assert_eq!(osl.acquire_lock(lock).err(), Some(OslError::Terminated));
    assert_eq!(osl.timer().err(), Some(OslError::Terminated));
    assert_eq!(
        osl.printf("late %d\n", &[1i32.into()]),
        Err(OslError::Terminated)
    );
}

#[test]
fn terminate_unbinds_interrupts() {
    extern "C" fn sci(_: usize) -> u32 {
        0
    }

    let p = Platform::new();
    let mut osl = p.active();
    osl.install_interrupt_handler(9, sci, 0).unwrap();
    assert_eq!(p.router.bound_gsis(), vec![9]);

    osl.begin_shutdown().unwrap();
    osl.terminate().unwrap();
    assert!(p.router.bound_gsis().is_empty());
}

#[test]
fn errors_map_to_interpreter_statuses() {
    assert_eq!(OslError::Timeout.status(), status::AE_TIME);
    assert_eq!(OslError::InvalidHandle.status(), status::AE_BAD_PARAMETER);
    assert_eq!(OslError::NoRootPointer.status(), status::AE_NOT_FOUND);
    assert_eq!(OslError::HandlerExists(9).status(), status::AE_ALREADY_EXISTS);
    assert_eq!(OslError::UnsupportedWidth(64).status(), status::AE_NOT_IMPLEMENTED);
    assert_eq!(
        kernel_acpi::AcpiStatus::from(OslError::NoMemory),
        status::AE_NO_MEMORY
    );
}

//! # Platform bring-up
//!
//! Decide from the boot hardware map whether the ACPI interpreter or the
//! device tree describes the machine, and drive the interpreter through its
//! initialization stages against a configured [`Osl`].

use crate::devtree::{FDT_HEADER_LEN, FdtHeader};
use crate::error::BringUpError;
use crate::osl::Osl;
use crate::status::AcpiStatus;
use kernel_info::hwmap::{BootHardwareMap, FirmwareSource};

/// The interpreter's initialization entry points, in call order.
pub trait Interpreter {
    fn initialize_subsystem(&mut self, osl: &Osl<'_>) -> AcpiStatus;
    fn initialize_tables(&mut self, osl: &Osl<'_>) -> AcpiStatus;
    fn load_tables(&mut self, osl: &Osl<'_>) -> AcpiStatus;
    fn enable_subsystem(&mut self, osl: &Osl<'_>) -> AcpiStatus;
    fn terminate(&mut self, osl: &Osl<'_>) -> AcpiStatus;
}

/// How the platform was brought up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BringUp {
    /// The interpreter owns the platform.
    Acpi,
    /// No ACPI; the checked device tree header is all the kernel gets.
    DeviceTree(FdtHeader),
}

type Stage<I> = fn(&mut I, &Osl<'_>) -> AcpiStatus;

/// Configure `osl` with `map` and hand the platform to its describer.
///
/// # Errors
/// Any configuration failure, a malformed device tree, or the first
/// interpreter stage that does not return `AE_OK`.
pub fn bring_up<I: Interpreter>(
    osl: &mut Osl<'_>,
    map: BootHardwareMap,
    interpreter: &mut I,
) -> Result<BringUp, BringUpError> {
    osl.configure(map)?;

    match map.firmware_source() {
        FirmwareSource::DeviceTree(blob) => {
            let bytes: [u8; FDT_HEADER_LEN] = osl.copy_physical(blob.start)?;
            let header = FdtHeader::parse(&bytes, blob.len())?;
            log::info!(
                "device tree at {:#x}: {} bytes, version {}",
                blob.start,
                header.total_size,
                header.version
            );
            Ok(BringUp::DeviceTree(header))
        }
        FirmwareSource::Acpi { root } => {
            if root.is_none() {
                log::info!("no RSDP from firmware; the interpreter will scan for one");
            }
            osl.activate()?;
            let stages: [(&'static str, Stage<I>); 4] = [
                ("initialize the subsystem", I::initialize_subsystem),
                ("initialize tables", I::initialize_tables),
                ("load tables", I::load_tables),
                ("enable the subsystem", I::enable_subsystem),
            ];
            for (stage, run) in stages {
                let status = run(interpreter, osl);
                if !status.is_ok() {
                    log::error!("ACPI bring-up failed to {stage}: {status}");
                    return Err(BringUpError::Interpreter { stage, status });
                }
            }
            Ok(BringUp::Acpi)
        }
    }
}

/// Stop the interpreter and tear the façade down.
///
/// # Errors
/// [`OslError::OutstandingObjects`](crate::OslError::OutstandingObjects) if
/// the interpreter kept cache objects, or the interpreter's own failure.
pub fn shut_down<I: Interpreter>(osl: &mut Osl<'_>, interpreter: &mut I) -> Result<(), BringUpError> {
    osl.begin_shutdown()?;
    let status = interpreter.terminate(osl);
    if !status.is_ok() {
        log::warn!("interpreter terminate returned {status}");
        return Err(BringUpError::Interpreter {
            stage: "terminate",
            status,
        });
    }
    osl.terminate()?;
    Ok(())
}

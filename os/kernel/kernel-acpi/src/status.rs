//! # Interpreter status codes
//!
//! Every callback result crosses the interpreter boundary as a 32-bit
//! `ACPI_STATUS`. The high nibble of the low word selects the exception class
//! (environmental `0x0000`, programmer `0x1000`); zero is success.

use core::fmt;
use kernel_info::width::AcpiStatusCode;

/// Raw interpreter status.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct AcpiStatus(pub AcpiStatusCode);

pub const AE_CODE_ENVIRONMENTAL: AcpiStatusCode = 0x0000;
pub const AE_CODE_PROGRAMMER: AcpiStatusCode = 0x1000;
const AE_CODE_MASK: AcpiStatusCode = 0xF000;

macro_rules! statuses {
    ($($name:ident = $value:expr;)*) => {
        $(pub const $name: AcpiStatus = AcpiStatus($value);)*

        const NAMES: &[(AcpiStatus, &str)] = &[$(($name, stringify!($name))),*];
    };
}

statuses! {
    AE_OK = 0x0000;
    AE_ERROR = AE_CODE_ENVIRONMENTAL | 0x0001;
    AE_NO_ACPI_TABLES = AE_CODE_ENVIRONMENTAL | 0x0002;
    AE_NO_NAMESPACE = AE_CODE_ENVIRONMENTAL | 0x0003;
    AE_NO_MEMORY = AE_CODE_ENVIRONMENTAL | 0x0004;
    AE_NOT_FOUND = AE_CODE_ENVIRONMENTAL | 0x0005;
    AE_NOT_EXIST = AE_CODE_ENVIRONMENTAL | 0x0006;
    AE_ALREADY_EXISTS = AE_CODE_ENVIRONMENTAL | 0x0007;
    AE_TYPE = AE_CODE_ENVIRONMENTAL | 0x0008;
    AE_NULL_OBJECT = AE_CODE_ENVIRONMENTAL | 0x0009;
    AE_NULL_ENTRY = AE_CODE_ENVIRONMENTAL | 0x000A;
    AE_BUFFER_OVERFLOW = AE_CODE_ENVIRONMENTAL | 0x000B;
    AE_STACK_OVERFLOW = AE_CODE_ENVIRONMENTAL | 0x000C;
    AE_STACK_UNDERFLOW = AE_CODE_ENVIRONMENTAL | 0x000D;
    AE_NOT_IMPLEMENTED = AE_CODE_ENVIRONMENTAL | 0x000E;
    AE_SUPPORT = AE_CODE_ENVIRONMENTAL | 0x000F;
    AE_LIMIT = AE_CODE_ENVIRONMENTAL | 0x0010;
    AE_TIME = AE_CODE_ENVIRONMENTAL | 0x0011;
    AE_ACQUIRE_DEADLOCK = AE_CODE_ENVIRONMENTAL | 0x0012;
    AE_RELEASE_DEADLOCK = AE_CODE_ENVIRONMENTAL | 0x0013;
    AE_NOT_ACQUIRED = AE_CODE_ENVIRONMENTAL | 0x0014;
    AE_ALREADY_ACQUIRED = AE_CODE_ENVIRONMENTAL | 0x0015;
    AE_NO_HARDWARE_RESPONSE = AE_CODE_ENVIRONMENTAL | 0x0016;
    AE_NO_GLOBAL_LOCK = AE_CODE_ENVIRONMENTAL | 0x0017;
    AE_ABORT_METHOD = AE_CODE_ENVIRONMENTAL | 0x0018;
    AE_SAME_HANDLER = AE_CODE_ENVIRONMENTAL | 0x0019;
    AE_NO_HANDLER = AE_CODE_ENVIRONMENTAL | 0x001A;
    AE_OWNER_ID_LIMIT = AE_CODE_ENVIRONMENTAL | 0x001B;
    AE_NOT_CONFIGURED = AE_CODE_ENVIRONMENTAL | 0x001C;
    AE_ACCESS = AE_CODE_ENVIRONMENTAL | 0x001D;
    AE_IO_ERROR = AE_CODE_ENVIRONMENTAL | 0x001E;

    AE_BAD_PARAMETER = AE_CODE_PROGRAMMER | 0x0001;
    AE_BAD_CHARACTER = AE_CODE_PROGRAMMER | 0x0002;
    AE_BAD_PATHNAME = AE_CODE_PROGRAMMER | 0x0003;
    AE_BAD_DATA = AE_CODE_PROGRAMMER | 0x0004;
    AE_BAD_HEX_CONSTANT = AE_CODE_PROGRAMMER | 0x0005;
    AE_BAD_OCTAL_CONSTANT = AE_CODE_PROGRAMMER | 0x0006;
    AE_BAD_DECIMAL_CONSTANT = AE_CODE_PROGRAMMER | 0x0007;
    AE_MISSING_ARGUMENTS = AE_CODE_PROGRAMMER | 0x0008;
    AE_BAD_ADDRESS = AE_CODE_PROGRAMMER | 0x0009;
}

impl AcpiStatus {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == AE_OK.0
    }

    #[must_use]
    pub const fn is_programmer_error(self) -> bool {
        self.0 & AE_CODE_MASK == AE_CODE_PROGRAMMER
    }

    /// `Ok(())` for [`AE_OK`], the status itself otherwise.
    ///
    /// # Errors
    /// Any status other than [`AE_OK`].
    pub const fn into_result(self) -> Result<(), Self> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }

    /// Symbolic name, if the code is a known exception.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find_map(|&(status, name)| (status == self).then_some(name))
    }
}

impl fmt::Display for AcpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "AE_UNKNOWN({:#06x})", self.0),
        }
    }
}

impl fmt::Debug for AcpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

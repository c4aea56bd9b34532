//! # Interpreter printf
//!
//! The interpreter reports through C-style format strings in two shapes: a
//! direct variadic call and a call with an already-captured argument list.
//! Both end up in [`render`], which expands the template into lines and hands
//! each one to a [`LineSink`].
//!
//! Rendering never fails. A template that asks for more arguments than were
//! passed is cut at the first placeholder that cannot be filled; an argument
//! of the wrong kind prints as `<badarg>`; unknown conversions are copied
//! through literally.
//!
//! Supported: flags `-+0#`, field width, precision, length `l`/`ll`, and the
//! conversions `d i u x X p c s %`. Without a length modifier integer
//! conversions operate on 32 bits, as C `int` would.

use core::fmt::{self, Write};

/// Longest line handed to a sink; longer output is split.
pub const LINE_CAPACITY: usize = 256;

const MAX_FIELD_WIDTH: usize = LINE_CAPACITY;
const BAD_ARG: &str = "<badarg>";
const BAD_PTR: &str = "<badptr>";

/// One captured printf argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatArg<'a> {
    Int(i64),
    Uint(u64),
    Char(u8),
    Ptr(usize),
    /// `None` stands for a null string pointer.
    Str(Option<&'a [u8]>),
}

macro_rules! from_integer {
    ($variant:ident: $($t:ty),*) => {$(
        impl From<$t> for FormatArg<'_> {
            fn from(v: $t) -> Self {
                Self::$variant(v.into())
            }
        }
    )*};
}

from_integer!(Int: i8, i16, i32, i64);
from_integer!(Uint: u8, u16, u32, u64);

impl From<usize> for FormatArg<'_> {
    fn from(v: usize) -> Self {
        Self::Uint(v as u64)
    }
}

impl From<isize> for FormatArg<'_> {
    fn from(v: isize) -> Self {
        Self::Int(v as i64)
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(v: &'a str) -> Self {
        Self::Str(Some(v.as_bytes()))
    }
}

impl<'a> From<&'a [u8]> for FormatArg<'a> {
    fn from(v: &'a [u8]) -> Self {
        Self::Str(Some(v))
    }
}

impl<T> From<*const T> for FormatArg<'_> {
    fn from(v: *const T) -> Self {
        Self::Ptr(v.addr())
    }
}

impl<T> From<*mut T> for FormatArg<'_> {
    fn from(v: *mut T) -> Self {
        Self::Ptr(v.addr())
    }
}

/// An already-captured argument list, consumed front to back.
pub trait ArgList<'a> {
    fn next_arg(&mut self) -> Option<FormatArg<'a>>;
}

/// [`ArgList`] over a slice, as built by [`acpi_printf!`](crate::acpi_printf).
pub struct SliceArgs<'s, 'a> {
    args: core::slice::Iter<'s, FormatArg<'a>>,
}

impl<'s, 'a> SliceArgs<'s, 'a> {
    #[must_use]
    pub fn new(args: &'s [FormatArg<'a>]) -> Self {
        Self { args: args.iter() }
    }
}

impl<'a> ArgList<'a> for SliceArgs<'_, 'a> {
    fn next_arg(&mut self) -> Option<FormatArg<'a>> {
        self.args.next().copied()
    }
}

/// Receives rendered lines, without their trailing newline.
pub trait LineSink {
    fn line(&mut self, line: &str);
}

/// Forwards lines to the `log` facade under the `acpica` target.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

impl LineSink for LogSink {
    fn line(&mut self, line: &str) {
        log::debug!(target: "acpica", "{line}");
    }
}

/// Summary of one [`render`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub lines: usize,
    /// The template ran out of arguments and was cut short.
    pub truncated: bool,
}

/// Expand `template` with `args` into `sink`.
///
/// Output is split at `\n`; blank lines are dropped and a trailing partial
/// line is flushed at the end.
pub fn render<'a>(template: &str, args: &mut dyn ArgList<'a>, sink: &mut dyn LineSink) -> Rendered {
    let mut out = LineBuffer::new(sink);
    let mut truncated = false;
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let directive = &rest[pos + 1..];
        let (spec, conversion, used) = Spec::parse(directive);
        rest = &directive[used..];

        match conversion {
            Some('%') => out.push('%'),
            Some(c) if Spec::is_conversion(c) => match args.next_arg() {
                Some(arg) => spec.write(&mut out, c, arg),
                None => {
                    truncated = true;
                    rest = "";
                    break;
                }
            },
            _ => {
                out.push('%');
                out.push_str(&directive[..used]);
            }
        }
    }
    out.push_str(rest);
    out.flush();

    Rendered {
        lines: out.lines,
        truncated,
    }
}

#[derive(Debug, Default, Copy, Clone)]
struct Spec {
    left: bool,
    plus: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
    long: bool,
}

impl Spec {
    const fn is_conversion(c: char) -> bool {
        matches!(c, 'd' | 'i' | 'u' | 'x' | 'X' | 'p' | 'c' | 's')
    }

    /// Parse the directive following a `%`. Returns the conversion character,
    /// if the template did not end first, and the bytes consumed.
    fn parse(s: &str) -> (Self, Option<char>, usize) {
        let bytes = s.as_bytes();
        let mut spec = Self::default();
        let mut i = 0;

        while let Some(&b) = bytes.get(i) {
            match b {
                b'-' => spec.left = true,
                b'+' => spec.plus = true,
                b'0' => spec.zero = true,
                b'#' => spec.alt = true,
                _ => break,
            }
            i += 1;
        }

        let (width, used) = Self::number(&bytes[i..]);
        spec.width = width;
        i += used;

        if bytes.get(i) == Some(&b'.') {
            let (precision, used) = Self::number(&bytes[i + 1..]);
            spec.precision = Some(precision);
            i += 1 + used;
        }

        if bytes.get(i) == Some(&b'l') {
            spec.long = true;
            i += 1;
            if bytes.get(i) == Some(&b'l') {
                i += 1;
            }
        }

        match s[i..].chars().next() {
            Some(c) => (spec, Some(c), i + c.len_utf8()),
            None => (spec, None, i),
        }
    }

    fn number(bytes: &[u8]) -> (usize, usize) {
        let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        let value = bytes[..digits].iter().fold(0usize, |acc, &d| {
            acc.saturating_mul(10).saturating_add(usize::from(d - b'0'))
        });
        (value.min(MAX_FIELD_WIDTH), digits)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn write(&self, out: &mut LineBuffer<'_>, conversion: char, arg: FormatArg<'_>) {
        match (conversion, arg) {
            ('d' | 'i', arg) => match signed(arg) {
                Some(v) => {
                    let v = if self.long { v } else { i64::from(v as i32) };
                    self.write_number(out, v < 0, v.unsigned_abs(), 'd');
                }
                None => out.push_str(BAD_ARG),
            },
            ('u' | 'x' | 'X' | 'p', arg) => match unsigned(arg) {
                Some(v) => {
                    let v = if self.long || conversion == 'p' {
                        v
                    } else {
                        u64::from(v as u32)
                    };
                    self.write_number(out, false, v, conversion);
                }
                None => out.push_str(BAD_ARG),
            },
            ('c', arg) => match unsigned(arg) {
                Some(v) => {
                    let mut tmp = [0u8; 4];
                    self.write_str(out, char::from(v as u8).encode_utf8(&mut tmp));
                }
                None => out.push_str(BAD_ARG),
            },
            ('s', FormatArg::Str(Some(bytes))) => {
                let bytes = match self.precision {
                    Some(p) => &bytes[..p.min(bytes.len())],
                    None => bytes,
                };
                self.write_str(out, valid_prefix(bytes));
            }
            ('s', FormatArg::Str(None)) => out.push_str(BAD_PTR),
            _ => out.push_str(BAD_ARG),
        }
    }

    fn write_number(&self, out: &mut LineBuffer<'_>, negative: bool, magnitude: u64, conversion: char) {
        let mut digits = Digits::default();
        let _ = match conversion {
            'x' | 'p' => write!(digits, "{magnitude:x}"),
            'X' => write!(digits, "{magnitude:X}"),
            _ => write!(digits, "{magnitude}"),
        };
        if self.precision == Some(0) && magnitude == 0 {
            digits.len = 0;
        }

        let sign = if negative {
            "-"
        } else if self.plus && conversion == 'd' {
            "+"
        } else {
            ""
        };
        let prefix = match conversion {
            'p' => "0x",
            'x' if self.alt && magnitude != 0 => "0x",
            'X' if self.alt && magnitude != 0 => "0X",
            _ => "",
        };
        let zeros = self.precision.unwrap_or(0).saturating_sub(digits.len);
        let body = sign.len() + prefix.len() + zeros + digits.len;
        let pad = self.width.saturating_sub(body);

        if self.left {
            out.push_str(sign);
            out.push_str(prefix);
            out.repeat('0', zeros);
            out.push_str(digits.as_str());
            out.repeat(' ', pad);
        } else if self.zero && self.precision.is_none() {
            out.push_str(sign);
            out.push_str(prefix);
            out.repeat('0', zeros + pad);
            out.push_str(digits.as_str());
        } else {
            out.repeat(' ', pad);
            out.push_str(sign);
            out.push_str(prefix);
            out.repeat('0', zeros);
            out.push_str(digits.as_str());
        }
    }

    fn write_str(&self, out: &mut LineBuffer<'_>, s: &str) {
        let pad = self.width.saturating_sub(s.chars().count());
        if self.left {
            out.push_str(s);
            out.repeat(' ', pad);
        } else {
            out.repeat(' ', pad);
            out.push_str(s);
        }
    }
}

fn signed(arg: FormatArg<'_>) -> Option<i64> {
    match arg {
        FormatArg::Int(v) => Some(v),
        FormatArg::Uint(v) => Some(i64::from_ne_bytes(v.to_ne_bytes())),
        FormatArg::Char(c) => Some(i64::from(c)),
        FormatArg::Ptr(_) | FormatArg::Str(_) => None,
    }
}

fn unsigned(arg: FormatArg<'_>) -> Option<u64> {
    match arg {
        FormatArg::Uint(v) => Some(v),
        FormatArg::Int(v) => Some(u64::from_ne_bytes(v.to_ne_bytes())),
        FormatArg::Char(c) => Some(u64::from(c)),
        FormatArg::Ptr(p) => Some(p as u64),
        FormatArg::Str(_) => None,
    }
}

/// Longest valid UTF-8 prefix.
fn valid_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

#[derive(Default)]
struct Digits {
    buf: [u8; 24],
    len: usize,
}

impl Digits {
    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }
}

impl Write for Digits {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        self.buf
            .get_mut(self.len..end)
            .ok_or(fmt::Error)?
            .copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Stack line buffer in front of a [`LineSink`].
struct LineBuffer<'s> {
    buf: [u8; LINE_CAPACITY],
    len: usize,
    lines: usize,
    sink: &'s mut dyn LineSink,
}

impl<'s> LineBuffer<'s> {
    fn new(sink: &'s mut dyn LineSink) -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            len: 0,
            lines: 0,
            sink,
        }
    }

    fn push(&mut self, c: char) {
        if c == '\n' {
            self.flush();
            return;
        }
        let mut tmp = [0u8; 4];
        let encoded = c.encode_utf8(&mut tmp).as_bytes();
        if self.len + encoded.len() > LINE_CAPACITY {
            self.flush();
        }
        self.buf[self.len..self.len + encoded.len()].copy_from_slice(encoded);
        self.len += encoded.len();
    }

    fn push_str(&mut self, s: &str) {
        s.chars().for_each(|c| self.push(c));
    }

    fn repeat(&mut self, c: char, n: usize) {
        (0..n).for_each(|_| self.push(c));
    }

    fn flush(&mut self) {
        if self.len == 0 {
            return;
        }
        // Only whole characters are ever pushed.
        if let Ok(line) = core::str::from_utf8(&self.buf[..self.len]) {
            self.sink.line(line);
            self.lines += 1;
        }
        self.len = 0;
    }
}

/// Render through an [`Osl`](crate::Osl) with arguments converted via
/// [`FormatArg::from`].
///
/// ```ignore
/// acpi_printf!(osl, "GPE %u at %p\n", 3u32, ptr)?;
/// ```
#[macro_export]
macro_rules! acpi_printf {
    ($osl:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $osl.printf($template, &[$($crate::printf::FormatArg::from($arg)),*])
    };
}

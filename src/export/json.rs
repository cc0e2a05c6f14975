//! JSON text output shared by the project exporters.
//!
//! Project files are read by tools that were written against JSON produced with four-space
//! indentation, ASCII-only strings and the shortest round-trip representation of floats
//! (`100.0`, `1e-05`). [`SfmFormatter`] reproduces that layout on top of
//! [`serde_json::ser::PrettyFormatter`].

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

const INDENT: &[u8] = b"    ";

/// Formats a float with the shortest representation that round-trips.
///
/// Integral values keep a trailing `.0`. Values with a decimal exponent below -4 or at
/// least 16 use exponent notation with a sign and at least two exponent digits.
///
/// ```rust
/// use sfm_utils::export::json::format_float;
///
/// assert_eq!(format_float(100.0), "100.0");
/// assert_eq!(format_float(0.0001), "0.0001");
/// assert_eq!(format_float(1e-5), "1e-05");
/// assert_eq!(format_float(1.5e16), "1.5e+16");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Debug output is the shortest round-trip repr and switches to exponent notation at the
    // same thresholds, only the exponent itself is written differently.
    let repr = format!("{value:?}");
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}

/// Pretty JSON formatter with four-space indentation, [`format_float`] numbers and `\uXXXX`
/// escapes for every non-ASCII character.
pub struct SfmFormatter<'a> {
    pretty: PrettyFormatter<'a>,
}

impl<'a> SfmFormatter<'a> {
    pub fn new() -> Self {
        SfmFormatter {
            pretty: PrettyFormatter::with_indent(INDENT),
        }
    }
}

impl Default for SfmFormatter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for SfmFormatter<'_> {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_float(value).as_bytes())
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(|b| b < 0x7f) {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (ch as u32) < 0x7f {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.pretty.end_object_value(writer)
    }
}

/// Serializes `value` into `writer` with [`SfmFormatter`].
pub fn to_json_writer<W, T>(writer: W, value: &T) -> Result<(), serde_json::Error>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut serializer = serde_json::Serializer::with_formatter(writer, SfmFormatter::new());
    value.serialize(&mut serializer)
}

/// Serializes `value` to a string with [`SfmFormatter`].
pub fn to_json_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: ?Sized + Serialize,
{
    let mut buffer = Vec::new();
    to_json_writer(&mut buffer, value)?;
    // Output is ASCII only
    String::from_utf8(buffer).map_err(serde::ser::Error::custom)
}

//! Character encodings named by `.cpg` sidecars.

use std::io::{Read, Seek};

use dbase::encoding::LossyCodePage;
use dbase::yore::code_pages::{
    CP437, CP850, CP852, CP861, CP865, CP866, CP874, CP1250, CP1251, CP1252, CP1253, CP1254,
    CP1255, CP1256,
};
use dbase::{Reader, UnicodeLossy};

/// Text encoding of a dBase table.
///
/// Latin-1 labels map to Windows-1252, which agrees with ISO 8859-1 on
/// every printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DbfEncoding {
    Utf8,
    Cp437,
    Cp850,
    Cp852,
    Cp861,
    Cp865,
    Cp866,
    Cp874,
    Cp1250,
    Cp1251,
    Cp1252,
    Cp1253,
    Cp1254,
    Cp1255,
    Cp1256,
}

impl DbfEncoding {
    /// Interpret the contents of a `.cpg` file.
    ///
    /// Accepts the spellings GDAL and ArcGIS write: `UTF-8`, `1252`,
    /// `CP1252`, `Windows-1252`, `ANSI 1252`, `OEM 850`, `ISO-8859-1`
    /// and friends.
    pub(crate) fn from_cpg(contents: &str) -> Option<Self> {
        let label = contents
            .trim_start_matches('\u{feff}')
            .trim()
            .to_ascii_uppercase()
            .replace(['_', ' '], "-");
        match label.as_str() {
            "UTF-8" | "UTF8" => return Some(Self::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "ISO88591" | "8859-1" | "88591" | "LATIN1"
            | "LATIN-1" => return Some(Self::Cp1252),
            _ => {}
        }
        let digits = ["WINDOWS-", "ANSI-", "OEM-", "CP-", "CP", "IBM"]
            .iter()
            .find_map(|prefix| label.strip_prefix(prefix))
            .unwrap_or(label.as_str());
        match digits.parse::<u16>().ok()? {
            437 => Some(Self::Cp437),
            850 => Some(Self::Cp850),
            852 => Some(Self::Cp852),
            861 => Some(Self::Cp861),
            865 => Some(Self::Cp865),
            866 => Some(Self::Cp866),
            874 => Some(Self::Cp874),
            1250 => Some(Self::Cp1250),
            1251 => Some(Self::Cp1251),
            1252 => Some(Self::Cp1252),
            1253 => Some(Self::Cp1253),
            1254 => Some(Self::Cp1254),
            1255 => Some(Self::Cp1255),
            1256 => Some(Self::Cp1256),
            _ => None,
        }
    }

    /// Decode the table's text fields with this encoding.
    ///
    /// Bytes the code page does not define become U+FFFD rather than
    /// failing the layer.
    pub(crate) fn install<T: Read + Seek>(self, reader: &mut Reader<T>) {
        match self {
            Self::Utf8 => reader.set_encoding(UnicodeLossy),
            Self::Cp437 => reader.set_encoding(LossyCodePage(CP437)),
            Self::Cp850 => reader.set_encoding(LossyCodePage(CP850)),
            Self::Cp852 => reader.set_encoding(LossyCodePage(CP852)),
            Self::Cp861 => reader.set_encoding(LossyCodePage(CP861)),
            Self::Cp865 => reader.set_encoding(LossyCodePage(CP865)),
            Self::Cp866 => reader.set_encoding(LossyCodePage(CP866)),
            Self::Cp874 => reader.set_encoding(LossyCodePage(CP874)),
            Self::Cp1250 => reader.set_encoding(LossyCodePage(CP1250)),
            Self::Cp1251 => reader.set_encoding(LossyCodePage(CP1251)),
            Self::Cp1252 => reader.set_encoding(LossyCodePage(CP1252)),
            Self::Cp1253 => reader.set_encoding(LossyCodePage(CP1253)),
            Self::Cp1254 => reader.set_encoding(LossyCodePage(CP1254)),
            Self::Cp1255 => reader.set_encoding(LossyCodePage(CP1255)),
            Self::Cp1256 => reader.set_encoding(LossyCodePage(CP1256)),
        }
    }
}

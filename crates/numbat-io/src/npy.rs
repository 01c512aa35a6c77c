//! NumPy `.npy` binary format
//!
//! A file is the magic string `\x93NUMPY`, a two-byte version, a
//! little-endian header length (`u16` for version 1.0, `u32` for 2.0 and
//! 3.0) and a Python dict literal padded with spaces so the payload starts
//! on a 64-byte boundary. The payload holds the raw elements in row-major
//! order, or in column-major order when `fortran_order` is `True`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info};

use numbat_tensor::shape::ravel_index;
use numbat_tensor::{NdArray, Order, Shape, Tensor, TensorError};

use crate::error::{Error, Result};

/// npy magic string
pub const NPY_MAGIC: [u8; 6] = *b"\x93NUMPY";

/// The payload starts at a multiple of this many bytes
pub const HEADER_ALIGNMENT: usize = 64;

/// Element types with an npy type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// `b1`
    Bool,
    /// `i1`
    I8,
    /// `u1`
    U8,
    /// `i2`
    I16,
    /// `u2`
    U16,
    /// `i4`
    I32,
    /// `u4`
    U32,
    /// `i8`
    I64,
    /// `u8`
    U64,
    /// `f2`
    F16,
    /// `f4`
    F32,
    /// `f8`
    F64,
}

impl Dtype {
    /// Kind letter and byte width, as in `'f8'`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bool => "b1",
            Self::I8 => "i1",
            Self::U8 => "u1",
            Self::I16 => "i2",
            Self::U16 => "u2",
            Self::I32 => "i4",
            Self::U32 => "u4",
            Self::I64 => "i8",
            Self::U64 => "u8",
            Self::F16 => "f2",
            Self::F32 => "f4",
            Self::F64 => "f8",
        }
    }

    /// Try to create from a type code without the byte-order marker
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "b1" => Some(Self::Bool),
            "i1" => Some(Self::I8),
            "u1" => Some(Self::U8),
            "i2" => Some(Self::I16),
            "u2" => Some(Self::U16),
            "i4" => Some(Self::I32),
            "u4" => Some(Self::U32),
            "i8" => Some(Self::I64),
            "u8" => Some(Self::U64),
            "f2" => Some(Self::F16),
            "f4" => Some(Self::F32),
            "f8" => Some(Self::F64),
            _ => None,
        }
    }

    /// Get the size of a single element in bytes
    pub fn element_size(&self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// The descriptor this crate writes: little-endian, or `|` for single bytes
    pub fn descr(&self) -> String {
        let marker = if self.element_size() == 1 { '|' } else { '<' };
        format!("{}{}", marker, self.code())
    }
}

/// Byte order of a stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// `<`
    Little,
    /// `>`
    Big,
    /// `|`, single-byte types
    NotApplicable,
}

/// Splits a descriptor such as `'<f8'` into its type and byte order
pub fn parse_descr(descr: &str) -> Result<(Dtype, Endianness)> {
    let unsupported = || Error::UnsupportedDtype(descr.to_string());
    let mut chars = descr.chars();
    let order = match chars.next() {
        Some('<') => Endianness::Little,
        Some('>') => Endianness::Big,
        Some('|') => Endianness::NotApplicable,
        Some('=') if cfg!(target_endian = "big") => Endianness::Big,
        Some('=') => Endianness::Little,
        _ => return Err(unsupported()),
    };
    let dtype = Dtype::from_code(chars.as_str()).ok_or_else(unsupported)?;
    if dtype.element_size() == 1 {
        return Ok((dtype, Endianness::NotApplicable));
    }
    if order == Endianness::NotApplicable {
        return Err(unsupported());
    }
    Ok((dtype, order))
}

/// Element types that can be stored in an npy payload
pub trait NpyElement: Copy {
    /// Stored type
    const DTYPE: Dtype;

    /// Reads one element stored with byte order `order`
    fn read_from<R: Read>(reader: &mut R, order: Endianness) -> io::Result<Self>;

    /// Writes one element in little-endian order
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

impl NpyElement for bool {
    const DTYPE: Dtype = Dtype::Bool;

    fn read_from<R: Read>(reader: &mut R, _order: Endianness) -> io::Result<Self> {
        Ok(reader.read_u8()? != 0)
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(u8::from(*self))
    }
}

impl NpyElement for i8 {
    const DTYPE: Dtype = Dtype::I8;

    fn read_from<R: Read>(reader: &mut R, _order: Endianness) -> io::Result<Self> {
        reader.read_i8()
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i8(*self)
    }
}

impl NpyElement for u8 {
    const DTYPE: Dtype = Dtype::U8;

    fn read_from<R: Read>(reader: &mut R, _order: Endianness) -> io::Result<Self> {
        reader.read_u8()
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(*self)
    }
}

macro_rules! impl_npy_element {
    ($($ty:ty => $dtype:ident, $read:ident, $write:ident);* $(;)?) => {
        $(
            impl NpyElement for $ty {
                const DTYPE: Dtype = Dtype::$dtype;

                fn read_from<R: Read>(reader: &mut R, order: Endianness) -> io::Result<Self> {
                    match order {
                        Endianness::Big => reader.$read::<BigEndian>(),
                        _ => reader.$read::<LittleEndian>(),
                    }
                }

                fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
                    writer.$write::<LittleEndian>(*self)
                }
            }
        )*
    };
}

impl_npy_element!(
    i16 => I16, read_i16, write_i16;
    u16 => U16, read_u16, write_u16;
    i32 => I32, read_i32, write_i32;
    u32 => U32, read_u32, write_u32;
    i64 => I64, read_i64, write_i64;
    u64 => U64, read_u64, write_u64;
    f32 => F32, read_f32, write_f32;
    f64 => F64, read_f64, write_f64;
);

#[cfg(feature = "f16")]
impl NpyElement for half::f16 {
    const DTYPE: Dtype = Dtype::F16;

    fn read_from<R: Read>(reader: &mut R, order: Endianness) -> io::Result<Self> {
        let bits = match order {
            Endianness::Big => reader.read_u16::<BigEndian>()?,
            _ => reader.read_u16::<LittleEndian>()?,
        };
        Ok(half::f16::from_bits(bits))
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.to_bits())
    }
}

/// Decoded npy header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    /// Type descriptor, e.g. `'<f8'`
    pub descr: String,
    /// Whether the payload is column-major
    pub fortran_order: bool,
    /// Array dimensions
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Header for a row-major payload
    pub fn new(dtype: Dtype, shape: &[usize]) -> Self {
        Self {
            descr: dtype.descr(),
            fortran_order: false,
            shape: shape.to_vec(),
        }
    }

    /// Stored element type and byte order
    pub fn dtype(&self) -> Result<(Dtype, Endianness)> {
        parse_descr(&self.descr)
    }

    /// Number of stored elements
    pub fn element_count(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::InvalidHeader(format!("shape {:?} overflows the address space", self.shape)))
    }

    /// Read the magic string, version and header from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic)?;
        if magic != NPY_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let len = match major {
            1 => reader.read_u16::<LittleEndian>()? as usize,
            2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
            _ => return Err(Error::UnsupportedVersion(major, minor)),
        };

        let mut raw = vec![0u8; len];
        reader.read_exact(&mut raw)?;
        let text = if major == 3 {
            String::from_utf8(raw).map_err(|e| Error::InvalidHeader(e.to_string()))?
        } else {
            // Latin-1
            raw.iter().map(|&b| b as char).collect()
        };

        let header = Self::parse(&text)?;
        debug!(version = major, descr = %header.descr, shape = ?header.shape, "read npy header");
        Ok(header)
    }

    /// Write the magic string, version and padded header
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let dict = self.render();
        let padded = |prefix: usize| {
            let unpadded = prefix + dict.len() + 1;
            let pad = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
            format!("{}{}\n", dict, " ".repeat(pad))
        };

        let mut text = padded(10);
        writer.write_all(&NPY_MAGIC)?;
        match u16::try_from(text.len()) {
            Ok(len) => {
                writer.write_all(&[1, 0])?;
                writer.write_u16::<LittleEndian>(len)?;
            }
            Err(_) => {
                text = padded(12);
                let len = u32::try_from(text.len())
                    .map_err(|_| Error::InvalidHeader("header longer than 4 GiB".to_string()))?;
                writer.write_all(&[2, 0])?;
                writer.write_u32::<LittleEndian>(len)?;
            }
        }
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn render(&self) -> String {
        let shape = match self.shape.as_slice() {
            [d] => format!("({},)", d),
            dims => format!(
                "({})",
                dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            self.descr,
            if self.fortran_order { "True" } else { "False" },
            shape
        )
    }

    fn parse(text: &str) -> Result<Self> {
        let mut parser = HeaderParser { rest: text };
        let mut descr = None;
        let mut fortran_order = None;
        let mut shape = None;

        parser.expect('{')?;
        loop {
            parser.skip_whitespace();
            if parser.eat('}') {
                break;
            }
            let key = parser.string()?;
            parser.expect(':')?;
            match (key.as_str(), parser.literal()?) {
                ("descr", Literal::Str(s)) => descr = Some(s),
                ("fortran_order", Literal::Bool(b)) => fortran_order = Some(b),
                ("shape", Literal::Tuple(dims)) => shape = Some(dims),
                (key, value) => {
                    return Err(Error::InvalidHeader(format!("unexpected entry '{}': {:?}", key, value)));
                }
            }
            parser.skip_whitespace();
            if !parser.eat(',') {
                parser.expect('}')?;
                break;
            }
        }
        if !parser.rest.trim().is_empty() {
            return Err(Error::InvalidHeader(format!("trailing data after dict: {:?}", parser.rest.trim())));
        }

        let missing = |key: &str| Error::InvalidHeader(format!("missing key '{}'", key));
        Ok(Self {
            descr: descr.ok_or_else(|| missing("descr"))?,
            fortran_order: fortran_order.ok_or_else(|| missing("fortran_order"))?,
            shape: shape.ok_or_else(|| missing("shape"))?,
        })
    }
}

/// Values that can appear in a header dict
#[derive(Debug)]
enum Literal {
    Str(String),
    Bool(bool),
    Tuple(Vec<usize>),
}

struct HeaderParser<'a> {
    rest: &'a str,
}

impl HeaderParser<'_> {
    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(Error::InvalidHeader(format!("expected '{}' at {:?}", c, self.rest)))
        }
    }

    fn string(&mut self) -> Result<String> {
        self.skip_whitespace();
        let quote = match self.rest.chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(Error::InvalidHeader(format!("expected a string at {:?}", self.rest))),
        };
        let body = &self.rest[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| Error::InvalidHeader("unterminated string".to_string()))?;
        self.rest = &body[end + 1..];
        Ok(body[..end].to_string())
    }

    fn literal(&mut self) -> Result<Literal> {
        self.skip_whitespace();
        if let Some(rest) = self.rest.strip_prefix("True") {
            self.rest = rest;
            return Ok(Literal::Bool(true));
        }
        if let Some(rest) = self.rest.strip_prefix("False") {
            self.rest = rest;
            return Ok(Literal::Bool(false));
        }
        if self.eat('(') {
            let mut dims = Vec::new();
            loop {
                if self.eat(')') {
                    break;
                }
                let digits = self.rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(self.rest.len());
                let dim = self.rest[..digits]
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidHeader(format!("bad dimension at {:?}", self.rest)))?;
                self.rest = &self.rest[digits..];
                // Python 2 long suffix
                self.rest = self.rest.strip_prefix('L').unwrap_or(self.rest);
                dims.push(dim);
                if !self.eat(',') {
                    self.expect(')')?;
                    break;
                }
            }
            return Ok(Literal::Tuple(dims));
        }
        self.string().map(Literal::Str)
    }
}

/// Reads an npy stream into a rank-`N` tensor
pub fn read_npy<T, const N: usize, R>(reader: &mut R) -> Result<Tensor<T, N>>
where
    T: NpyElement,
    R: Read,
{
    let header = NpyHeader::read_from(reader)?;
    let (dtype, order) = header.dtype()?;
    if dtype != T::DTYPE {
        return Err(Error::DtypeMismatch {
            expected: T::DTYPE.descr(),
            found: header.descr.clone(),
        });
    }
    if header.shape.len() != N {
        return Err(Error::RankMismatch {
            expected: N,
            found: header.shape.len(),
        });
    }
    let shape = Shape::<N>::from_slice(&header.shape)?;
    let count = header.element_count()?;

    let mut data = Vec::new();
    data.try_reserve_exact(count).map_err(|_| {
        TensorError::allocation_failure(
            "NPY_PAYLOAD_ALLOCATION",
            format!("cannot allocate {} elements for shape {}", count, shape),
            count.saturating_mul(dtype.element_size()),
            "Check that the header shape is genuine",
        )
    })?;
    for _ in 0..count {
        data.push(T::read_from(reader, order)?);
    }

    let tensor = if header.fortran_order && N > 1 {
        Tensor::from_fn(shape, |index| data[ravel_index(index.coords(), &shape, Order::ColumnMajor)])?
    } else {
        Tensor::from_vec(shape, data)?
    };
    Ok(tensor)
}

/// Writes any array as a row-major npy stream
pub fn write_npy<A, const N: usize, W>(writer: &mut W, array: &A) -> Result<()>
where
    A: NdArray<N> + ?Sized,
    A::Elem: NpyElement,
    W: Write,
{
    NpyHeader::new(<A::Elem as NpyElement>::DTYPE, array.shape().as_slice()).write_to(writer)?;
    for x in array.iter() {
        x.write_to(writer)?;
    }
    Ok(())
}

/// Loads a `.npy` file
pub fn load_npy<T, const N: usize, P>(path: P) -> Result<Tensor<T, N>>
where
    T: NpyElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let tensor = read_npy(&mut reader)?;
    info!(path = %path.display(), shape = %tensor.shape(), "loaded npy file");
    Ok(tensor)
}

/// Saves any array to a `.npy` file
pub fn save_npy<A, const N: usize, P>(path: P, array: &A) -> Result<()>
where
    A: NdArray<N> + ?Sized,
    A::Elem: NpyElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_npy(&mut writer, array)?;
    writer.flush()?;
    info!(path = %path.display(), shape = %array.shape(), "saved npy file");
    Ok(())
}

//! Delimited text files for vectors and matrices
//!
//! One matrix row per line. A vector is written one element per line and
//! read back from either a single row or a single column.

use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use numbat_tensor::{NdArray, Shape, Tensor};

use crate::error::{Error, Result};

/// Layout of a delimited text file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Field separator; a whitespace-only delimiter matches any run of
    /// whitespace when reading
    pub delimiter: String,
    /// Comment prefix; reading ignores everything after its trimmed form
    pub comments: String,
    /// Text written before the data, each line prefixed with `comments`
    pub header: Option<String>,
    /// Lines skipped before reading
    pub skip_rows: usize,
    /// Fractional digits for written elements; `None` uses `Display`
    pub precision: Option<usize>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            delimiter: " ".to_string(),
            comments: "# ".to_string(),
            header: None,
            skip_rows: 0,
            precision: None,
        }
    }
}

impl TextOptions {
    /// Sets the field separator
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Sets the comment prefix
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Sets the header text
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Sets the number of leading lines to skip
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Sets the number of fractional digits
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        if self.delimiter.trim().is_empty() {
            line.split_whitespace().collect()
        } else {
            line.split(self.delimiter.as_str()).map(str::trim).collect()
        }
    }
}

/// Writes a vector or matrix as delimited text
pub fn write_txt<A, const N: usize, W>(writer: &mut W, array: &A, options: &TextOptions) -> Result<()>
where
    A: NdArray<N> + ?Sized,
    A::Elem: Display,
    W: Write,
{
    let columns = match N {
        1 => 1,
        2 => array.shape()[1],
        _ => return Err(Error::UnsupportedRank(N)),
    };

    if let Some(header) = &options.header {
        for line in header.lines() {
            writeln!(writer, "{}{}", options.comments, line)?;
        }
    }

    let mut row = Vec::with_capacity(columns);
    for x in array.iter() {
        row.push(match options.precision {
            Some(digits) => format!("{:.*}", digits, x),
            None => x.to_string(),
        });
        if row.len() == columns {
            writeln!(writer, "{}", row.join(&options.delimiter))?;
            row.clear();
        }
    }
    Ok(())
}

/// Reads delimited text into a vector or matrix
pub fn read_txt<T, const N: usize, R>(reader: R, options: &TextOptions) -> Result<Tensor<T, N>>
where
    T: FromStr,
    T::Err: Display,
    R: BufRead,
{
    if N != 1 && N != 2 {
        return Err(Error::UnsupportedRank(N));
    }
    let marker = options.comments.trim();

    let mut data = Vec::new();
    let mut rows = 0usize;
    let mut columns = None;
    for (number, line) in reader.lines().enumerate().skip(options.skip_rows) {
        let line = line?;
        let content = match line.find(marker) {
            Some(at) if !marker.is_empty() => &line[..at],
            _ => line.as_str(),
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        let fields = options.split(content);
        match columns {
            None => columns = Some(fields.len()),
            Some(expected) if expected != fields.len() => {
                return Err(Error::Parse {
                    line: number + 1,
                    message: format!("expected {} columns, found {}", expected, fields.len()),
                });
            }
            Some(_) => {}
        }
        for field in fields {
            let value = field.parse::<T>().map_err(|e| Error::Parse {
                line: number + 1,
                message: format!("cannot parse '{}': {}", field, e),
            })?;
            data.push(value);
        }
        rows += 1;
    }

    let columns = columns.unwrap_or(0);
    let dims = if N == 2 {
        vec![rows, columns]
    } else if rows <= 1 || columns == 1 {
        vec![data.len()]
    } else {
        return Err(Error::RankMismatch { expected: 1, found: 2 });
    };
    Ok(Tensor::from_vec(Shape::<N>::from_slice(&dims)?, data)?)
}

/// Saves a vector or matrix to a text file
pub fn save_txt<A, const N: usize, P>(path: P, array: &A, options: &TextOptions) -> Result<()>
where
    A: NdArray<N> + ?Sized,
    A::Elem: Display,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_txt(&mut writer, array, options)?;
    writer.flush()?;
    info!(path = %path.display(), shape = %array.shape(), "saved text file");
    Ok(())
}

/// Loads a vector or matrix from a text file
pub fn load_txt<T, const N: usize, P>(path: P, options: &TextOptions) -> Result<Tensor<T, N>>
where
    T: FromStr,
    T::Err: Display,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let tensor = read_txt(BufReader::new(File::open(path)?), options)?;
    info!(path = %path.display(), shape = %tensor.shape(), "loaded text file");
    Ok(tensor)
}

//! NumPy-style pretty-printing
//!
//! Elements are rendered together so they share one width. Arrays larger
//! than [`PrintOptions::threshold`] show only the first and last
//! [`PrintOptions::edge_items`] entries of each long axis.
//!
//! ```
//! use numbat_io::{format_tensor, PrintOptions};
//! use numbat_tensor::Tensor;
//!
//! let a = Tensor::from_vec([2, 3], vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]).unwrap();
//! assert_eq!(format_tensor(&a, &PrintOptions::default()), "[[0.  0.5 1. ]\n [1.5 2.  2.5]]");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use numbat_tensor::NdArray;

/// How non-negative numbers are signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// Only negative numbers carry a sign
    #[default]
    Minus,
    /// Non-negative numbers get `+`
    Plus,
    /// Non-negative numbers get a space
    Space,
}

/// Formatting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Maximum fractional digits of floats
    pub precision: usize,
    /// Arrays with more elements than this are summarized
    pub threshold: usize,
    /// Entries kept at each end of a summarized axis
    pub edge_items: usize,
    /// Innermost rows wrap past this many characters
    pub line_width: usize,
    /// Text between elements
    pub separator: String,
    /// Always use positional notation, rounding tiny values to zero
    pub suppress_small: bool,
    /// Sign policy
    pub sign: Sign,
    /// Rendering of NaN
    pub nan_str: String,
    /// Rendering of infinity
    pub inf_str: String,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            precision: 8,
            threshold: 1000,
            edge_items: 3,
            line_width: 75,
            separator: " ".to_string(),
            suppress_small: false,
            sign: Sign::Minus,
            nan_str: "nan".to_string(),
            inf_str: "inf".to_string(),
        }
    }
}

impl PrintOptions {
    /// Sets the float precision
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Sets the summarization threshold
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the entries kept at each end of a summarized axis
    pub fn with_edge_items(mut self, edge_items: usize) -> Self {
        self.edge_items = edge_items;
        self
    }

    /// Sets the line width
    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    /// Sets the element separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Forces positional notation
    pub fn with_suppress_small(mut self, suppress_small: bool) -> Self {
        self.suppress_small = suppress_small;
        self
    }

    /// Sets the sign policy
    pub fn with_sign(mut self, sign: Sign) -> Self {
        self.sign = sign;
        self
    }

    /// Sets the NaN and infinity renderings
    pub fn with_special_values(mut self, nan_str: impl Into<String>, inf_str: impl Into<String>) -> Self {
        self.nan_str = nan_str.into();
        self.inf_str = inf_str.into();
        self
    }
}

/// Element types that can be pretty-printed
pub trait FormatElement {
    /// Renders every value to a string of one shared width
    fn format_batch(values: &[&Self], options: &PrintOptions) -> Vec<String>;
}

fn align_right(cells: Vec<String>) -> Vec<String> {
    let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    cells.into_iter().map(|c| format!("{:>width$}", c, width = width)).collect()
}

fn with_sign(body: String, negative: bool, sign: Sign) -> String {
    match (negative, sign) {
        (true, _) => format!("-{}", body),
        (false, Sign::Plus) => format!("+{}", body),
        (false, Sign::Space) => format!(" {}", body),
        (false, Sign::Minus) => body,
    }
}

impl FormatElement for bool {
    fn format_batch(values: &[&Self], _options: &PrintOptions) -> Vec<String> {
        align_right(
            values
                .iter()
                .map(|&&b| if b { "True" } else { "False" }.to_string())
                .collect(),
        )
    }
}

macro_rules! impl_format_int {
    ($($t:ty),*) => {
        $(
            impl FormatElement for $t {
                fn format_batch(values: &[&Self], options: &PrintOptions) -> Vec<String> {
                    align_right(
                        values
                            .iter()
                            .map(|v| {
                                let text = v.to_string();
                                match text.strip_prefix('-') {
                                    Some(body) => with_sign(body.to_string(), true, options.sign),
                                    None => with_sign(text, false, options.sign),
                                }
                            })
                            .collect(),
                    )
                }
            }
        )*
    };
}

impl_format_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FormatElement for f64 {
    fn format_batch(values: &[&Self], options: &PrintOptions) -> Vec<String> {
        let values: Vec<f64> = values.iter().map(|&&x| x).collect();
        format_floats(&values, options)
    }
}

impl FormatElement for f32 {
    fn format_batch(values: &[&Self], options: &PrintOptions) -> Vec<String> {
        let values: Vec<f64> = values.iter().map(|&&x| f64::from(x)).collect();
        format_floats(&values, options)
    }
}

#[cfg(feature = "f16")]
impl FormatElement for half::f16 {
    fn format_batch(values: &[&Self], options: &PrintOptions) -> Vec<String> {
        let values: Vec<f64> = values.iter().map(|x| x.to_f64()).collect();
        format_floats(&values, options)
    }
}

/// Digits of `{:.precision$}` rendering after trailing zeros are dropped;
/// always keeps the decimal point
fn trimmed_fixed(x: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, x);
    if text.contains('.') {
        text.trim_end_matches('0').to_string()
    } else {
        format!("{}.", text)
    }
}

fn fraction_digits(mantissa: &str) -> usize {
    mantissa.split_once('.').map_or(0, |(_, frac)| frac.len())
}

fn format_floats(values: &[f64], options: &PrintOptions) -> Vec<String> {
    let magnitudes: Vec<f64> = values
        .iter()
        .filter(|x| x.is_finite() && **x != 0.0)
        .map(|x| x.abs())
        .collect();
    let max = magnitudes.iter().copied().fold(0.0f64, f64::max);
    let min = magnitudes.iter().copied().fold(f64::INFINITY, f64::min);
    let scientific = !magnitudes.is_empty()
        && (max >= 1e8 || (!options.suppress_small && (min < 1e-4 || max / min > 1e3)));

    let finite = if scientific {
        scientific_cells(values, options)
    } else {
        positional_cells(values, options)
    };

    let cells = values
        .iter()
        .zip(finite)
        .map(|(&x, cell)| match cell {
            Some(cell) => cell,
            None if x.is_nan() => options.nan_str.clone(),
            None => with_sign(options.inf_str.clone(), x < 0.0, options.sign),
        })
        .collect();
    align_right(cells)
}

/// Fixed-point cells for the finite values, padded so the decimal points line up
fn positional_cells(values: &[f64], options: &PrintOptions) -> Vec<Option<String>> {
    let parts: Vec<Option<(String, String)>> = values
        .iter()
        .map(|&x| {
            x.is_finite().then(|| {
                let body = trimmed_fixed(x.abs(), options.precision);
                let (int, frac) = body.split_once('.').unwrap_or((body.as_str(), ""));
                (with_sign(int.to_string(), x.is_sign_negative(), options.sign), frac.to_string())
            })
        })
        .collect();

    let int_width = parts.iter().flatten().map(|(i, _)| i.chars().count()).max().unwrap_or(0);
    let frac_width = parts.iter().flatten().map(|(_, f)| f.len()).max().unwrap_or(0);
    parts
        .into_iter()
        .map(|part| {
            part.map(|(int, frac)| format!("{:>iw$}.{:<fw$}", int, frac, iw = int_width, fw = frac_width))
        })
        .collect()
}

/// Scientific cells for the finite values, all with the same mantissa digits
fn scientific_cells(values: &[f64], options: &PrintOptions) -> Vec<Option<String>> {
    let digits = values
        .iter()
        .filter(|x| x.is_finite())
        .map(|x| {
            let text = format!("{:.*e}", options.precision, x.abs());
            let mantissa = text.split('e').next().unwrap_or("");
            fraction_digits(mantissa.trim_end_matches('0'))
        })
        .max()
        .unwrap_or(0);

    values
        .iter()
        .map(|&x| {
            x.is_finite().then(|| {
                let text = format!("{:.*e}", digits, x.abs());
                let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let point = if digits == 0 { "." } else { "" };
                let body = format!(
                    "{}{}e{}{:02}",
                    mantissa,
                    point,
                    if exponent < 0 { '-' } else { '+' },
                    exponent.unsigned_abs()
                );
                with_sign(body, x.is_sign_negative(), options.sign)
            })
        })
        .collect()
}

/// Positions shown along an axis; `None` marks the summarization gap
fn axis_plan(len: usize, summarize: bool, edge_items: usize) -> Vec<Option<usize>> {
    if summarize && len > 2 * edge_items {
        (0..edge_items)
            .map(Some)
            .chain(std::iter::once(None))
            .chain((len - edge_items..len).map(Some))
            .collect()
    } else {
        (0..len).map(Some).collect()
    }
}

fn gather<'a, A, const N: usize>(
    array: &'a A,
    plan: &[Vec<Option<usize>>],
    axis: usize,
    coords: &mut [usize; N],
    out: &mut Vec<&'a A::Elem>,
) where
    A: NdArray<N> + ?Sized,
{
    for &step in &plan[axis] {
        let Some(i) = step else { continue };
        coords[axis] = i;
        if axis + 1 == N {
            if let Some(value) = array.get(*coords) {
                out.push(value);
            }
        } else {
            gather(array, plan, axis + 1, coords, out);
        }
    }
}

fn render<I>(plan: &[Vec<Option<usize>>], axis: usize, cells: &mut I, options: &PrintOptions) -> String
where
    I: Iterator<Item = String>,
{
    let indent = " ".repeat(axis + 1);
    let joint = options.separator.trim_end();

    if axis + 1 == plan.len() {
        let mut text = String::from("[");
        let mut line_len = 1;
        for (k, step) in plan[axis].iter().enumerate() {
            let word = match step {
                Some(_) => cells.next().unwrap_or_default(),
                None => "...".to_string(),
            };
            let word_len = word.chars().count();
            if k > 0 {
                if line_len + options.separator.len() + word_len + 1 > options.line_width {
                    text.push_str(joint);
                    text.push('\n');
                    text.push_str(&indent);
                    line_len = indent.len();
                } else {
                    text.push_str(&options.separator);
                    line_len += options.separator.len();
                }
            }
            text.push_str(&word);
            line_len += word_len;
        }
        text.push(']');
        return text;
    }

    let gap = "\n".repeat(plan.len() - axis - 1);
    let mut text = String::from("[");
    for (k, step) in plan[axis].iter().enumerate() {
        if k > 0 {
            text.push_str(joint);
            text.push_str(&gap);
            text.push_str(&indent);
        }
        match step {
            Some(_) => text.push_str(&render(plan, axis + 1, cells, options)),
            None => text.push_str("..."),
        }
    }
    text.push(']');
    text
}

/// Renders any array in NumPy's nested-bracket layout
pub fn format_tensor<A, const N: usize>(array: &A, options: &PrintOptions) -> String
where
    A: NdArray<N> + ?Sized,
    A::Elem: FormatElement,
{
    if array.is_empty() {
        return "[]".to_string();
    }

    let shape = array.shape();
    let summarize = array.size() > options.threshold;
    let plan: Vec<Vec<Option<usize>>> = shape
        .as_slice()
        .iter()
        .map(|&len| axis_plan(len, summarize, options.edge_items))
        .collect();

    let mut values = Vec::new();
    gather(array, &plan, 0, &mut [0usize; N], &mut values);
    let mut cells = <A::Elem as FormatElement>::format_batch(&values, options).into_iter();
    render(&plan, 0, &mut cells, options)
}

/// `Display` adaptor printing an array with [`format_tensor`]
pub struct Printed<'a, A: ?Sized, const N: usize> {
    array: &'a A,
    options: PrintOptions,
}

impl<'a, A, const N: usize> Printed<'a, A, N>
where
    A: NdArray<N> + ?Sized,
{
    /// Prints with the default options
    pub fn new(array: &'a A) -> Self {
        Self::with_options(array, PrintOptions::default())
    }

    /// Prints with explicit options
    pub fn with_options(array: &'a A, options: PrintOptions) -> Self {
        Self { array, options }
    }
}

impl<A, const N: usize> fmt::Display for Printed<'_, A, N>
where
    A: NdArray<N> + ?Sized,
    A::Elem: FormatElement,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_tensor(self.array, &self.options))
    }
}

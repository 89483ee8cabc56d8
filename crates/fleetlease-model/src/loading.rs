// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Instance loader for the equipment leasing domain.
//!
//! Instances are stored as whitespace-delimited records, each introduced by a
//! one-letter tag. The horizon comes first, followed by equipment units,
//! customers and their orders in any order, as long as a customer is declared
//! before its orders reference it. Lines may contain comments introduced by
//! `#`.
//!
//! ```raw
//! T horizon
//! E type begin end x y nseg (slope intercept breakpoint)*nseg
//! C revenue
//! O customer type begin end x y setup switch
//! F customer type earliest latest min_duration x y setup switch
//! ```
//!
//! A location written as `- -` means the entity has none.

use crate::{
    index::CustomerIndex,
    location::Location,
    model::{
        EquipmentSpec, FlexibleWindow, Instance, InstanceBuildError, InstanceBuilder,
        ModelOptions, OrderSpec,
    },
    rent::{RentFunction, RentFunctionError, RentSegment},
};
use fleetlease_core::math::window::TimeWindow;
use std::{
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};

/// The error type for the instance loading process.
#[derive(Debug)]
pub enum InstanceLoaderError {
    /// An I/O error occurred while reading the input stream.
    Io(std::io::Error),
    /// The input stream ended in the middle of a record.
    UnexpectedEof,
    /// A token could not be parsed into the expected type.
    Parse(ParseTokenError),
    /// A record is malformed.
    InvalidRecord { record: usize, reason: String },
    /// A rent function is invalid.
    Rent {
        record: usize,
        error: RentFunctionError,
    },
    /// The records do not describe a valid instance.
    Build(InstanceBuildError),
}

/// Details about a failed token parsing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTokenError {
    /// The string token that failed to parse.
    pub token: String,
    /// The name of the type we tried to parse into.
    pub type_name: &'static str,
}

impl std::fmt::Display for ParseTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Could not parse token '{}' as type {}",
            self.token, self.type_name
        )
    }
}

impl std::error::Error for ParseTokenError {}

impl Display for InstanceLoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::UnexpectedEof => write!(f, "Unexpected end of file while parsing instance"),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::InvalidRecord { record, reason } => {
                write!(f, "Invalid record {}: {}", record, reason)
            }
            Self::Rent { record, error } => write!(f, "Invalid rent in record {}: {}", record, error),
            Self::Build(e) => write!(f, "Invalid instance: {}", e),
        }
    }
}

impl std::error::Error for InstanceLoaderError {}

impl From<std::io::Error> for InstanceLoaderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseTokenError> for InstanceLoaderError {
    fn from(e: ParseTokenError) -> Self {
        Self::Parse(e)
    }
}

impl From<InstanceBuildError> for InstanceLoaderError {
    fn from(e: InstanceBuildError) -> Self {
        Self::Build(e)
    }
}

/// A configurable loader for leasing instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceLoader {
    options: ModelOptions,
}

impl InstanceLoader {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the options used to derive the loaded instance.
    #[inline]
    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads an instance from a type implementing `BufRead`.
    pub fn from_bufread<R: BufRead>(&self, rdr: R) -> Result<Instance, InstanceLoaderError> {
        let mut sc = Scanner::new(rdr);
        let mut builder: Option<InstanceBuilder> = None;
        let mut record = 0usize;

        while let Some(tag) = sc.next_opt::<String>()? {
            record += 1;
            if tag == "T" {
                if builder.is_some() {
                    return Err(invalid(record, "horizon declared twice"));
                }
                builder = Some(InstanceBuilder::new(sc.next()?));
                continue;
            }
            let Some(b) = builder.as_mut() else {
                return Err(invalid(record, "the horizon record must come first"));
            };
            match tag.as_str() {
                "E" => {
                    let equipment_type: usize = sc.next()?;
                    let window = read_window(&mut sc, record)?;
                    let location = read_location(&mut sc)?;
                    let segments: usize = sc.next()?;
                    let mut pieces = Vec::with_capacity(segments);
                    for _ in 0..segments {
                        let slope: f64 = sc.next()?;
                        let intercept: f64 = sc.next()?;
                        let breakpoint: usize = sc.next()?;
                        pieces.push(RentSegment::new(slope, intercept, breakpoint));
                    }
                    let rent = RentFunction::new(pieces)
                        .map_err(|error| InstanceLoaderError::Rent { record, error })?;
                    let mut spec = EquipmentSpec::new(equipment_type, window, rent);
                    spec.location = location;
                    b.add_equipment(spec);
                }
                "C" => {
                    b.add_customer(sc.next()?);
                }
                "O" => {
                    let customer = CustomerIndex::new(sc.next()?);
                    let equipment_type: usize = sc.next()?;
                    let window = read_window(&mut sc, record)?;
                    let mut spec = OrderSpec::new(customer, equipment_type, window);
                    spec.location = read_location(&mut sc)?;
                    spec.setup_cost = sc.next()?;
                    spec.switch_cost = sc.next()?;
                    b.add_order(spec);
                }
                "F" => {
                    let customer = CustomerIndex::new(sc.next()?);
                    let equipment_type: usize = sc.next()?;
                    let earliest: usize = sc.next()?;
                    let latest: usize = sc.next()?;
                    let min_duration: usize = sc.next()?;
                    if min_duration == 0 || earliest + min_duration > latest {
                        return Err(invalid(record, "flexible window is too short"));
                    }
                    let flex = FlexibleWindow::new(earliest, latest, min_duration);
                    let mut spec = OrderSpec::flexible(customer, equipment_type, flex);
                    spec.location = read_location(&mut sc)?;
                    spec.setup_cost = sc.next()?;
                    spec.switch_cost = sc.next()?;
                    b.add_order(spec);
                }
                other => {
                    return Err(invalid(record, &format!("unknown record tag '{}'", other)));
                }
            }
        }

        let builder = builder.ok_or(InstanceLoaderError::UnexpectedEof)?;
        let instance = builder.build(&self.options)?;
        tracing::debug!(records = record, "instance loaded");
        Ok(instance)
    }

    /// Loads an instance from a file path.
    #[inline]
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Instance, InstanceLoaderError> {
        let file = File::open(path)?;
        self.from_bufread(BufReader::new(file))
    }

    /// Loads an instance from a generic reader.
    #[inline]
    pub fn from_reader<R: Read>(&self, r: R) -> Result<Instance, InstanceLoaderError> {
        self.from_bufread(BufReader::new(r))
    }

    /// Loads an instance from a string slice.
    #[inline]
    pub fn from_str(&self, s: &str) -> Result<Instance, InstanceLoaderError> {
        self.from_reader(s.as_bytes())
    }
}

fn invalid(record: usize, reason: &str) -> InstanceLoaderError {
    InstanceLoaderError::InvalidRecord {
        record,
        reason: reason.to_owned(),
    }
}

fn read_window<R: BufRead>(
    sc: &mut Scanner<R>,
    record: usize,
) -> Result<TimeWindow, InstanceLoaderError> {
    let begin: usize = sc.next()?;
    let end: usize = sc.next()?;
    TimeWindow::try_new(begin, end).ok_or_else(|| invalid(record, "window begins after it ends"))
}

fn read_location<R: BufRead>(
    sc: &mut Scanner<R>,
) -> Result<Option<Location>, InstanceLoaderError> {
    let x: String = sc.next()?;
    let y: String = sc.next()?;
    if x == "-" && y == "-" {
        return Ok(None);
    }
    Ok(Some(Location::new(parse_token(&x)?, parse_token(&y)?)))
}

fn parse_token<T: FromStr>(token: &str) -> Result<T, InstanceLoaderError> {
    token.parse::<T>().map_err(|_| {
        InstanceLoaderError::Parse(ParseTokenError {
            token: token.to_owned(),
            type_name: std::any::type_name::<T>(),
        })
    })
}

/// Reads whitespace-delimited tokens, skipping `#` comments.
struct Scanner<R> {
    rdr: R,
    buf: String,
    pos: usize,
}

impl<R: BufRead> Scanner<R> {
    #[inline]
    fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::new(),
            pos: 0,
        }
    }

    /// Refills the line buffer. Returns `Ok(false)` on EOF.
    #[inline]
    fn fill_line(&mut self) -> Result<bool, InstanceLoaderError> {
        self.buf.clear();
        self.pos = 0;
        let n = self
            .rdr
            .read_line(&mut self.buf)
            .map_err(InstanceLoaderError::Io)?;
        Ok(n > 0)
    }

    fn next<T: FromStr>(&mut self) -> Result<T, InstanceLoaderError> {
        self.next_opt()?.ok_or(InstanceLoaderError::UnexpectedEof)
    }

    /// The next token parsed into `T`, or `None` at the end of the input.
    fn next_opt<T: FromStr>(&mut self) -> Result<Option<T>, InstanceLoaderError> {
        loop {
            if self.pos >= self.buf.len() && !self.fill_line()? {
                return Ok(None);
            }

            let line = &self.buf[..self.buf.find('#').unwrap_or(self.buf.len())];
            let rest = line.get(self.pos..).unwrap_or("");
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                self.pos = self.buf.len();
                continue;
            }
            let start = self.pos + (rest.len() - trimmed.len());
            let len = trimmed
                .find(char::is_whitespace)
                .unwrap_or(trimmed.len());
            let token = &self.buf[start..start + len];
            self.pos = start + len;
            return parse_token(token).map(Some);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{EquipmentIndex, OrderIndex};

    const SMALL_INSTANCE: &str = r#"
        T 10               # horizon
        E 0 0 10 0 0 2 1.5 2 4 1 5 10
        E 1 2 8 - - 1 0 7 10
        C 120
        C 40
        O 0 0 1 5 3 4 0 2
        F 1 1 2 8 3 - - 1 0
    "#;

    #[test]
    fn test_loads_all_record_kinds() {
        let inst = InstanceLoader::new()
            .from_str(SMALL_INSTANCE)
            .expect("Failed to load");
        assert_eq!(inst.horizon(), 10);
        assert_eq!(inst.num_equipment(), 2);
        assert_eq!(inst.num_customers(), 2);
        assert_eq!(inst.num_groups(), 2);
        // the flexible order expands into (2,5], (3,6], (4,7], (5,8]
        assert_eq!(inst.num_orders(), 5);

        let e0 = inst.equipment(EquipmentIndex::new(0));
        assert_eq!(e0.rent().num_segments(), 2);
        assert_eq!(e0.rent().rent(4), 8.0);
        assert_eq!(e0.rent().rent(6), 11.0);
        assert!(inst.equipment(EquipmentIndex::new(1)).location().is_none());

        let o = inst.order(OrderIndex::new(0));
        assert_eq!(o.window(), TimeWindow::new(1, 5));
        assert_eq!(o.switch_cost(), 2.0);
    }

    #[test]
    fn test_options_are_applied() {
        let inst = InstanceLoader::new()
            .options(ModelOptions::default().flexible(false))
            .from_str(SMALL_INSTANCE)
            .expect("Failed to load");
        assert_eq!(inst.num_orders(), 2);
    }

    #[test]
    fn test_missing_horizon() {
        let res = InstanceLoader::new().from_str("C 10");
        assert!(matches!(
            res,
            Err(InstanceLoaderError::InvalidRecord { record: 1, .. })
        ));
    }

    #[test]
    fn test_truncated_record() {
        let res = InstanceLoader::new().from_str("T 5\nE 0 0 5 0 0 1 1.0");
        assert!(matches!(res, Err(InstanceLoaderError::UnexpectedEof)));
    }

    #[test]
    fn test_parse_error_structure() {
        let res = InstanceLoader::new().from_str("T 5 C lots");
        match res {
            Err(InstanceLoaderError::Parse(e)) => {
                assert_eq!(e.token, "lots");
                assert!(e.type_name.contains("f64"));
            }
            _ => panic!("Expected Parse error with context"),
        }
    }

    #[test]
    fn test_build_errors_are_forwarded() {
        let res = InstanceLoader::new().from_str("T 5\nO 3 0 0 2 - - 0 0");
        assert!(matches!(
            res,
            Err(InstanceLoaderError::Build(InstanceBuildError::UnknownCustomer { .. }))
        ));
    }
}

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fmt;
use std::io::BufRead;
use thiserror::Error;

/// Column width of a normalized TLE data line.
pub const DATA_LINE_LEN: usize = 69;
/// Longest name kept for a record.
pub const NAME_MAX_LEN: usize = 22;
/// Lines at most this long are never taken for data lines.
const NAME_LINE_THRESHOLD: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("data line {line} is {len} characters, expected {DATA_LINE_LEN}")]
    TooShort { line: u8, len: usize },
    #[error("data line {line} does not start with '{line} '")]
    BadMarker { line: u8 },
    #[error("data line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },
    #[error("invalid catalog number '{0}'")]
    CatalogId(String),
    #[error("catalog numbers differ between lines ({0} vs {1})")]
    CatalogMismatch(u32, u32),
}

/// One object's element set: an optional name plus the two fixed-column data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalRecord {
    catalog_id: u32,
    name: String,
    line1: String,
    line2: String,
}

impl OrbitalRecord {
    /// Normalize and validate a record. Data lines are truncated to 69 columns,
    /// the name is trimmed and truncated to 22 characters.
    pub fn new(name: &str, line1: &str, line2: &str) -> Result<Self, RecordError> {
        let line1 = normalize_data_line(line1, 1)?;
        let line2 = normalize_data_line(line2, 2)?;

        let catalog_id = parse_catalog_id(&line1[2..7])?;
        let catalog_id2 = parse_catalog_id(&line2[2..7])?;
        if catalog_id != catalog_id2 {
            return Err(RecordError::CatalogMismatch(catalog_id, catalog_id2));
        }

        Ok(Self {
            catalog_id,
            name: normalize_name(name),
            line1,
            line2,
        })
    }

    pub fn catalog_id(&self) -> u32 {
        self.catalog_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// The name, or the catalog number for unnamed records.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.catalog_id.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Decode the fixed-column orbital elements.
    pub fn elements(&self) -> ElementSet {
        ElementSet::decode(&self.line1, &self.line2)
    }
}

fn normalize_data_line(raw: &str, line: u8) -> Result<String, RecordError> {
    let normalized: String = raw
        .trim_end_matches(['\r', '\n'])
        .chars()
        .take(DATA_LINE_LEN)
        .collect();
    let len = normalized.chars().count();
    if len < DATA_LINE_LEN {
        return Err(RecordError::TooShort { line, len });
    }
    if !normalized.is_ascii() {
        return Err(RecordError::NonAscii { line });
    }
    let marker = char::from(b'0' + line);
    if !normalized.starts_with(marker) || normalized.as_bytes()[1] != b' ' {
        return Err(RecordError::BadMarker { line });
    }
    Ok(normalized)
}

fn normalize_name(raw: &str) -> String {
    raw.trim_end().chars().take(NAME_MAX_LEN).collect()
}

fn parse_catalog_id(field: &str) -> Result<u32, RecordError> {
    field
        .trim()
        .parse()
        .map_err(|_| RecordError::CatalogId(field.to_string()))
}

// ── Element decoding ────────────────────────────────────────────────────────

/// Orbital elements decoded from the data lines. Fields that fail to decode are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet {
    pub classification: char,
    pub designator: String,
    pub epoch: Option<DateTime<Utc>>,
    pub mean_motion_dot: Option<f64>,
    pub mean_motion_ddot: Option<f64>,
    pub bstar: Option<f64>,
    pub inclination: Option<f64>,
    pub right_ascension: Option<f64>,
    pub eccentricity: Option<f64>,
    pub argument_of_perigee: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub mean_motion: Option<f64>,
    pub revolution_number: Option<u32>,
}

impl ElementSet {
    // Both lines are validated 69-column ASCII, so byte slicing is safe.
    fn decode(line1: &str, line2: &str) -> Self {
        Self {
            classification: line1.as_bytes()[7] as char,
            designator: line1[9..17].trim().to_string(),
            epoch: parse_epoch(&line1[18..20], &line1[20..32]),
            mean_motion_dot: parse_float(&line1[33..43]),
            mean_motion_ddot: parse_implied_exponent(&line1[44..52]),
            bstar: parse_implied_exponent(&line1[53..61]),
            inclination: parse_float(&line2[8..16]),
            right_ascension: parse_float(&line2[17..25]),
            eccentricity: parse_float(&format!("0.{}", line2[26..33].trim())),
            argument_of_perigee: parse_float(&line2[34..42]),
            mean_anomaly: parse_float(&line2[43..51]),
            mean_motion: parse_float(&line2[52..63]),
            revolution_number: line2[63..68].trim().parse().ok(),
        }
    }
}

fn parse_float(field: &str) -> Option<f64> {
    field.trim().parse().ok()
}

/// Decode the `±NNNNN±E` notation: an implied leading decimal point and a power of ten.
fn parse_implied_exponent(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.len() < 3 {
        return None;
    }
    let (mantissa, exponent) = field.split_at(field.len() - 2);
    let exponent: i32 = exponent.parse().ok()?;
    let (sign, digits) = match mantissa.strip_prefix('-') {
        Some(digits) => (-1.0, digits),
        None => (1.0, mantissa.trim_start_matches('+')),
    };
    let mantissa: f64 = format!("0.{}", digits).parse().ok()?;
    Some(sign * mantissa * 10f64.powi(exponent))
}

fn parse_epoch(year: &str, day: &str) -> Option<DateTime<Utc>> {
    let year: i32 = year.trim().parse().ok()?;
    let year = if year < 57 { 2000 + year } else { 1900 + year };
    let day: f64 = day.trim().parse().ok()?;
    let start = NaiveDate::from_yo_opt(year, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    let offset = TimeDelta::try_milliseconds(((day - 1.0) * 86_400_000.0).round() as i64)?;
    start.checked_add_signed(offset)
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLine {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The stream ended before the record's data lines were complete.
    Incomplete(DataLine),
    Malformed(RecordError),
    Read(String),
    /// Neither a local file nor a fetchable location.
    Unreachable(String),
}

/// A recoverable problem tied to a source and a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source: String,
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}: ", self.source, self.line)?;
        match &self.kind {
            DiagnosticKind::Incomplete(DataLine::First) => {
                write!(f, "unexpected end of input reading TLE line 1")
            }
            DiagnosticKind::Incomplete(DataLine::Second) => {
                write!(f, "unexpected end of input reading TLE line 2")
            }
            DiagnosticKind::Malformed(err) => write!(f, "malformed record: {}", err),
            DiagnosticKind::Read(err) => write!(f, "read error: {}", err),
            DiagnosticKind::Unreachable(err) => write!(f, "unreachable source: {}", err),
        }
    }
}

// ── Parser ──────────────────────────────────────────────────────────────────

/// Everything recovered from one stream.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<OrbitalRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Streaming TLE parser accepting two-line and three-line groups.
pub struct TleParser<R> {
    reader: R,
    source: String,
    line_no: usize,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> TleParser<R> {
    pub fn new(source: impl Into<String>, reader: R) -> Self {
        Self {
            reader,
            source: source.into(),
            line_no: 0,
            buf: Vec::with_capacity(128),
            finished: false,
        }
    }

    /// Next line without its terminator. `Ok(None)` at EOF.
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Read a line that must exist; ends the stream with a diagnostic otherwise.
    fn require_line(&mut self, which: DataLine) -> Result<String, Diagnostic> {
        match self.read_line() {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(self.finish(DiagnosticKind::Incomplete(which))),
            Err(e) => Err(self.finish(DiagnosticKind::Read(e.to_string()))),
        }
    }

    fn finish(&mut self, kind: DiagnosticKind) -> Diagnostic {
        self.finished = true;
        Diagnostic {
            source: self.source.clone(),
            line: self.line_no + 1,
            kind,
        }
    }

    /// Next record, a diagnostic for a group that could not be completed, or
    /// `None` once the stream is exhausted.
    pub fn next_record(&mut self) -> Option<Result<OrbitalRecord, Diagnostic>> {
        if self.finished {
            return None;
        }
        let first = match self.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => return Some(Err(self.finish(DiagnosticKind::Read(e.to_string())))),
        };

        let (name, line1) = if is_name_line(&first) {
            match self.require_line(DataLine::First) {
                Ok(line1) => (first, line1),
                Err(diag) => return Some(Err(diag)),
            }
        } else {
            (String::new(), first)
        };
        let line1_no = self.line_no;

        let line2 = match self.require_line(DataLine::Second) {
            Ok(line2) => line2,
            Err(diag) => return Some(Err(diag)),
        };

        Some(
            OrbitalRecord::new(&name, &line1, &line2).map_err(|err| Diagnostic {
                source: self.source.clone(),
                line: line1_no,
                kind: DiagnosticKind::Malformed(err),
            }),
        )
    }
}

impl<R: BufRead> Iterator for TleParser<R> {
    type Item = Result<OrbitalRecord, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

/// Free text rather than column data: short, or missing the line-1 marker.
fn is_name_line(line: &str) -> bool {
    !line.starts_with("1 ") || line.chars().count() <= NAME_LINE_THRESHOLD
}

/// Parse a whole stream, collecting records and diagnostics.
pub fn parse<R: BufRead>(source: &str, reader: R) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for item in TleParser::new(source, reader) {
        match item {
            Ok(record) => outcome.records.push(record),
            Err(diag) => outcome.diagnostics.push(diag),
        }
    }
    outcome
}

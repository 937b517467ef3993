use std::fmt;
use std::str::FromStr;

/// Partition index within a dataset's shared partition space.
pub type PartitionId = u32;

/// Semantic type of a column. The discriminants are the wire type bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColumnType {
    /// Column with no values; every cell is NA.
    Empty = 0,
    /// 128-bit identifier stored as two 64-bit halves.
    Uuid = 1,
    /// Free-text string.
    String = 2,
    /// Number; see [`NumericKind`] for its payload.
    Numeric = 3,
    /// Integer code into a shared, ordered string domain.
    Categorical = 4,
    /// Epoch milliseconds; integer-valued.
    Time = 5,
}

impl ColumnType {
    /// All column types, in wire-code order.
    pub const ALL: [ColumnType; 6] = [
        ColumnType::Empty,
        ColumnType::Uuid,
        ColumnType::String,
        ColumnType::Numeric,
        ColumnType::Categorical,
        ColumnType::Time,
    ];

    /// Wire type byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire type byte.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Short lowercase name used in logs and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Empty => "empty",
            ColumnType::Uuid => "uuid",
            ColumnType::String => "str",
            ColumnType::Numeric => "num",
            ColumnType::Categorical => "cat",
            ColumnType::Time => "time",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" | "bad" => Ok(ColumnType::Empty),
            "uuid" => Ok(ColumnType::Uuid),
            "str" | "string" => Ok(ColumnType::String),
            "num" | "numeric" => Ok(ColumnType::Numeric),
            "cat" | "categorical" | "enum" => Ok(ColumnType::Categorical),
            "time" => Ok(ColumnType::Time),
            other => Err(format!("unknown column type: {other}")),
        }
    }
}

/// Payload of a numeric column, fixed for every partition of the column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// 8-byte integer; fractional values are rejected.
    Integer,
    /// 8-byte float.
    #[default]
    Real,
}

/// Declared column of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    /// Payload of a `Numeric` column. Ignored for other types.
    pub numeric: NumericKind,
    /// Ordered categorical levels. Empty for other types.
    pub domain: Vec<String>,
}

impl ColumnSpec {
    /// A column of `column_type`. Numeric columns are real-valued.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            numeric: NumericKind::Real,
            domain: Vec::new(),
        }
    }

    /// An integer-valued numeric column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            numeric: NumericKind::Integer,
            ..Self::new(name, ColumnType::Numeric)
        }
    }

    /// True when present cells export as 8-byte integers.
    pub fn is_integral(&self) -> bool {
        match self.column_type {
            ColumnType::Time => true,
            ColumnType::Numeric => self.numeric == NumericKind::Integer,
            _ => false,
        }
    }

    /// A categorical column with a pre-declared domain.
    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        domain: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            domain: domain.into_iter().map(Into::into).collect(),
            ..Self::new(name, ColumnType::Categorical)
        }
    }
}

/// A value appended to a column builder during ingest.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Na,
    Num(f64),
    Str(String),
}

/// A value read back from a sealed partition.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Str(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NA"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Real(v) => write!(f, "{v}"),
            Cell::Str(v) => f.write_str(v),
        }
    }
}

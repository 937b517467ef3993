use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{Cell, CellValue, ColumnSpec, ColumnType};

/// Append-only values of one column of one unsealed partition.
#[derive(Debug)]
pub(crate) enum ColumnBuilder {
    /// Row count of an all-NA column.
    Empty(usize),
    Real(Vec<Option<f64>>),
    /// Integer numeric or time values.
    Integer {
        column_type: ColumnType,
        values: Vec<Option<i64>>,
    },
    Text(Vec<Option<String>>),
    Categorical {
        levels: Vec<String>,
        lookup: HashMap<String, u32>,
        codes: Vec<Option<u32>>,
    },
    Uuid(Vec<Option<(u64, u64)>>),
}

impl ColumnBuilder {
    pub(crate) fn new(spec: &ColumnSpec) -> Self {
        match spec.column_type {
            ColumnType::Empty => ColumnBuilder::Empty(0),
            ColumnType::Numeric if !spec.is_integral() => ColumnBuilder::Real(Vec::new()),
            ColumnType::Numeric | ColumnType::Time => ColumnBuilder::Integer {
                column_type: spec.column_type,
                values: Vec::new(),
            },
            ColumnType::String => ColumnBuilder::Text(Vec::new()),
            ColumnType::Categorical => ColumnBuilder::Categorical {
                levels: Vec::new(),
                lookup: HashMap::new(),
                codes: Vec::new(),
            },
            ColumnType::Uuid => ColumnBuilder::Uuid(Vec::new()),
        }
    }

    pub(crate) fn column_type(&self) -> ColumnType {
        match self {
            ColumnBuilder::Empty(_) => ColumnType::Empty,
            ColumnBuilder::Real(_) => ColumnType::Numeric,
            ColumnBuilder::Integer { column_type, .. } => *column_type,
            ColumnBuilder::Text(_) => ColumnType::String,
            ColumnBuilder::Categorical { .. } => ColumnType::Categorical,
            ColumnBuilder::Uuid(_) => ColumnType::Uuid,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnBuilder::Empty(rows) => *rows,
            ColumnBuilder::Real(v) => v.len(),
            ColumnBuilder::Integer { values, .. } => values.len(),
            ColumnBuilder::Text(v) => v.len(),
            ColumnBuilder::Categorical { codes, .. } => codes.len(),
            ColumnBuilder::Uuid(v) => v.len(),
        }
    }

    pub(crate) fn append(&mut self, column: usize, value: CellValue) -> Result<()> {
        let column_type = self.column_type();
        let mismatch = |value: String| StoreError::TypeMismatch {
            column,
            column_type,
            value,
        };

        match (self, value) {
            (ColumnBuilder::Empty(rows), CellValue::Na) => *rows += 1,
            (ColumnBuilder::Real(v), CellValue::Na) => v.push(None),
            (ColumnBuilder::Integer { values, .. }, CellValue::Na) => values.push(None),
            (ColumnBuilder::Text(v), CellValue::Na) => v.push(None),
            (ColumnBuilder::Categorical { codes, .. }, CellValue::Na) => codes.push(None),
            (ColumnBuilder::Uuid(v), CellValue::Na) => v.push(None),

            (ColumnBuilder::Real(v), CellValue::Num(n)) => v.push(Some(n)),
            (ColumnBuilder::Integer { values, .. }, CellValue::Num(n)) => match as_integral(n) {
                Some(i) => values.push(Some(i)),
                None => return Err(mismatch(format!("non-integral number {n}"))),
            },
            (ColumnBuilder::Text(v), CellValue::Str(s)) => v.push(Some(s)),
            (
                ColumnBuilder::Categorical {
                    levels,
                    lookup,
                    codes,
                },
                CellValue::Str(s),
            ) => {
                let code = match lookup.get(&s) {
                    Some(code) => *code,
                    None => {
                        let code = u32::try_from(levels.len())
                            .map_err(|_| mismatch("more than u32::MAX levels".to_string()))?;
                        levels.push(s.clone());
                        lookup.insert(s, code);
                        code
                    }
                };
                codes.push(Some(code));
            }
            (ColumnBuilder::Uuid(v), CellValue::Str(s)) => match Uuid::parse_str(&s) {
                Ok(uuid) => v.push(Some(uuid.as_u64_pair())),
                Err(source) => {
                    return Err(StoreError::InvalidUuid {
                        column,
                        text: s,
                        source,
                    })
                }
            },

            (_, CellValue::Num(n)) => return Err(mismatch(format!("number {n}"))),
            (_, CellValue::Str(s)) => return Err(mismatch(format!("string {s:?}"))),
        }
        Ok(())
    }

    /// Seal into read-only column data laid out as `spec` declares.
    ///
    /// Numeric values are converted when `spec` changed sub-type after the
    /// builder was allocated. Categorical levels not yet in the domain are
    /// appended to it and local codes are rewritten to domain positions.
    pub(crate) fn finish(self, column: usize, spec: &mut ColumnSpec) -> Result<ColumnData> {
        let integral = spec.is_integral();
        let data = match self {
            ColumnBuilder::Empty(rows) => ColumnData::Empty(rows),
            ColumnBuilder::Real(values) if integral => {
                let values = values
                    .into_iter()
                    .map(|v| match v {
                        None => Ok(None),
                        Some(n) => as_integral(n).map(Some).ok_or_else(|| {
                            StoreError::TypeMismatch {
                                column,
                                column_type: spec.column_type,
                                value: format!("non-integral number {n}"),
                            }
                        }),
                    })
                    .collect::<Result<Vec<_>>>()?;
                ColumnData::Integer(values)
            }
            ColumnBuilder::Real(values) => ColumnData::Real(values),
            ColumnBuilder::Integer { values, .. } if !integral => {
                ColumnData::Real(values.into_iter().map(|v| v.map(|i| i as f64)).collect())
            }
            ColumnBuilder::Integer { values, .. } => ColumnData::Integer(values),
            ColumnBuilder::Text(values) => ColumnData::Text(values),
            ColumnBuilder::Categorical { levels, codes, .. } => {
                let domain = &mut spec.domain;
                let mut positions: HashMap<&str, u32> = domain
                    .iter()
                    .enumerate()
                    .map(|(i, level)| (level.as_str(), i as u32))
                    .collect();
                let mut remap = Vec::with_capacity(levels.len());
                let mut added = Vec::new();
                for level in &levels {
                    let code = match positions.get(level.as_str()) {
                        Some(code) => *code,
                        None => {
                            let code = (domain.len() + added.len()) as u32;
                            positions.insert(level.as_str(), code);
                            added.push(level.clone());
                            code
                        }
                    };
                    remap.push(code);
                }
                domain.extend(added);
                let codes = codes
                    .into_iter()
                    .map(|code| code.map(|local| remap[local as usize]))
                    .collect();
                ColumnData::Categorical(codes)
            }
            ColumnBuilder::Uuid(values) => ColumnData::Uuid(values),
        };
        Ok(data)
    }
}

/// Sealed, read-only values of one column of one partition.
#[derive(Debug)]
pub(crate) enum ColumnData {
    Empty(usize),
    Real(Vec<Option<f64>>),
    Integer(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
    Categorical(Vec<Option<u32>>),
    Uuid(Vec<Option<(u64, u64)>>),
}

impl ColumnData {
    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnData::Empty(rows) => *rows,
            ColumnData::Real(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Uuid(v) => v.len(),
        }
    }

    pub(crate) fn cell(&self, row: usize, domain: &[String]) -> Result<Cell> {
        let len = self.len();
        let out_of_range = || StoreError::OutOfRange {
            what: "row",
            index: row,
            len,
        };

        let cell = match self {
            ColumnData::Empty(rows) if row < *rows => Cell::Null,
            ColumnData::Empty(_) => return Err(out_of_range()),
            ColumnData::Real(v) => match v.get(row).ok_or_else(out_of_range)? {
                None => Cell::Null,
                Some(n) => Cell::Real(*n),
            },
            ColumnData::Integer(v) => match v.get(row).ok_or_else(out_of_range)? {
                None => Cell::Null,
                Some(i) => Cell::Int(*i),
            },
            ColumnData::Text(v) => match v.get(row).ok_or_else(out_of_range)? {
                None => Cell::Null,
                Some(s) => Cell::Str(s.clone()),
            },
            ColumnData::Categorical(v) => match v.get(row).ok_or_else(out_of_range)? {
                None => Cell::Null,
                Some(code) => {
                    let level = domain
                        .get(*code as usize)
                        .ok_or(StoreError::OutOfRange {
                            what: "domain level",
                            index: *code as usize,
                            len: domain.len(),
                        })?;
                    Cell::Str(level.clone())
                }
            },
            ColumnData::Uuid(v) => match v.get(row).ok_or_else(out_of_range)? {
                None => Cell::Null,
                Some((hi, lo)) => Cell::Str(Uuid::from_u64_pair(*hi, *lo).to_string()),
            },
        };
        Ok(cell)
    }
}

/// `Some(i)` when `v` is a finite whole number representable as `i64`.
fn as_integral(v: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if v.is_finite() && v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v) {
        Some(v as i64)
    } else {
        None
    }
}

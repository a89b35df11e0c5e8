use std::fmt;
use thiserror::Error;

/// Key column shared by clinical and feature tables.
pub const SUBJECT: &str = "Subject";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("table has no header row")]
    EmptyFile,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single cell of a typed table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(_) | CellValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Parse `raw` as a cell of a column of type `kind`.
    pub(crate) fn parse(raw: &str, kind: ColumnType) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return CellValue::Null;
        }
        match kind {
            ColumnType::Integer => raw
                .parse()
                .map(CellValue::Integer)
                .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
            ColumnType::Float => raw
                .parse()
                .map(CellValue::Float)
                .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
            ColumnType::Text => CellValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    /// Narrowest type that can hold every non-empty value in `raw`.
    pub(crate) fn infer<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = ColumnType::Integer;
        for value in raw.into_iter().map(str::trim).filter(|v| !v.is_empty()) {
            if kind == ColumnType::Integer && value.parse::<i64>().is_err() {
                kind = ColumnType::Float;
            }
            if kind == ColumnType::Float && value.parse::<f64>().is_err() {
                return ColumnType::Text;
            }
        }
        kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Named, typed value columns. The `Subject` key is kept out of the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column)?;
        }
        Ok(schema)
    }

    pub fn push(&mut self, column: Column) -> Result<(), TableError> {
        if column.name == SUBJECT || self.index_of(&column.name).is_some() {
            return Err(TableError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Fail on the first of `names` that is not a column.
    pub fn require(&self, names: &[impl AsRef<str>]) -> Result<(), TableError> {
        match names
            .iter()
            .map(AsRef::<str>::as_ref)
            .find(|name| *name != SUBJECT && self.index_of(name).is_none())
        {
            Some(missing) => Err(TableError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}

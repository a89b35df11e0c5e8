use crate::{
    PatientId,
    table::{CellValue, Column, ColumnType, SUBJECT, Schema, TableError},
};

use std::{collections::HashSet, io, path::Path};

/// One patient's clinical attributes, aligned with the table's [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalRecord {
    pub subject: PatientId,
    pub values: Vec<CellValue>,
}

/// Clinical attributes keyed by `Subject`, as read from a CSV export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicalTable {
    schema: Schema,
    records: Vec<ClinicalRecord>,
}

impl ClinicalTable {
    pub fn new(schema: Schema, records: Vec<ClinicalRecord>) -> Self {
        Self { schema, records }
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a CSV with a header row. Column types are inferred from the
    /// data; `Subject` is required and kept as text.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(TableError::EmptyFile);
        }

        let subject_idx = headers
            .iter()
            .position(|h| h == SUBJECT)
            .ok_or_else(|| TableError::MissingColumn(SUBJECT.to_string()))?;

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = Vec::with_capacity(headers.len() - 1);
        for (idx, name) in headers.iter().enumerate() {
            if idx == subject_idx {
                continue;
            }
            let kind = ColumnType::infer(rows.iter().map(|row| row.get(idx).unwrap_or("")));
            columns.push((idx, Column::new(name.clone(), kind)));
        }
        let schema = Schema::new(columns.iter().map(|(_, c)| c.clone()).collect())?;

        let records = rows
            .iter()
            .map(|row| ClinicalRecord {
                subject: row.get(subject_idx).unwrap_or("").trim().to_string(),
                values: columns
                    .iter()
                    .map(|(idx, column)| CellValue::parse(row.get(*idx).unwrap_or(""), column.kind))
                    .collect(),
            })
            .collect();

        Ok(Self { schema, records })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[ClinicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self, n: usize) -> &[ClinicalRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// The first `n` records as tab separated text, header included.
    pub fn format_head(&self, n: usize) -> String {
        let header: Vec<&str> = std::iter::once(SUBJECT)
            .chain(self.schema.columns().iter().map(|c| c.name.as_str()))
            .collect();
        let mut out = header.join("\t");
        out.push('\n');
        for record in self.head(n) {
            let cells: Vec<String> = std::iter::once(record.subject.clone())
                .chain(record.values.iter().map(ToString::to_string))
                .collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }

    /// Subjects in order of first appearance, without repeats.
    pub fn unique_subjects(&self) -> Vec<PatientId> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.subject.as_str()))
            .map(|r| r.subject.clone())
            .collect()
    }

    pub fn value<'a>(&self, record: &'a ClinicalRecord, column: &str) -> Option<&'a CellValue> {
        self.schema
            .index_of(column)
            .and_then(|idx| record.values.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CSV: &str = "\
Subject,Group,Sex,Age,Visit
002_S_0295,CN,M,85,1
011_S_0002,AD,F,73.5,
002_S_0295,CN,M,85,2
";

    #[test]
    fn reads_typed_columns() {
        let table = ClinicalTable::from_reader(CSV.as_bytes()).unwrap();

        let kinds: Vec<_> = table
            .schema()
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("Group", ColumnType::Text),
                ("Sex", ColumnType::Text),
                ("Age", ColumnType::Float),
                ("Visit", ColumnType::Integer),
            ]
        );

        let second = &table.records()[1];
        assert_eq!(second.subject, "011_S_0002");
        assert_eq!(table.value(second, "Age"), Some(&CellValue::Float(73.5)));
        assert_eq!(table.value(second, "Visit"), Some(&CellValue::Null));
    }

    #[test]
    fn unique_subjects_keep_first_appearance_order() {
        let table = ClinicalTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.unique_subjects(), vec!["002_S_0295", "011_S_0002"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 3);
    }

    #[test]
    fn values_outlive_the_table_borrow() {
        let table = ClinicalTable::from_reader(CSV.as_bytes()).unwrap();
        let record = table.records()[0].clone();
        let age = {
            let table = table.clone();
            table.value(&record, "Age")
        };
        assert_eq!(age, Some(&CellValue::Float(85.0)));
        assert_eq!(table.value(&record, "Weight"), None);
    }

    #[test]
    fn head_is_rendered_with_its_header() {
        let table = ClinicalTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            table.format_head(2),
            "Subject\tGroup\tSex\tAge\tVisit\n\
             002_S_0295\tCN\tM\t85\t1\n\
             011_S_0002\tAD\tF\t73.5\t\n"
        );
    }

    #[test]
    fn numeric_subjects_are_kept_as_text() {
        let table = ClinicalTable::from_reader("Age,Subject\n70,0042\n".as_bytes()).unwrap();
        assert_eq!(table.records()[0].subject, "0042");
    }

    #[test]
    fn missing_subject_column_fails_fast() {
        let err = ClinicalTable::from_reader("Patient,Age\nA,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "Subject"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ClinicalTable::from_reader("".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::EmptyFile));
    }

    #[test]
    fn malformed_rows_are_csv_errors() {
        let err = ClinicalTable::from_reader("Subject,Age\nA,1,extra\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Csv(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClinicalTable::from_csv(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));
    }
}

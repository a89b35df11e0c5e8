use crate::{
    PatientId,
    clinical::ClinicalTable,
    features::{FeatureTable, IntensityFeatures, MEAN_INTENSITY, STD_INTENSITY},
    table::{CellValue, Column, ColumnType, SUBJECT, Schema, TableError},
};

use std::{io, path::Path};

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    pub subject: PatientId,
    pub values: Vec<CellValue>,
}

/// Clinical attributes followed by intensity features, one row per match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    schema: Schema,
    records: Vec<CombinedRecord>,
}

/// Inner join of clinical records and features on `Subject`.
///
/// Subjects present on only one side are dropped. Rows follow the clinical
/// table's order and duplicate clinical subjects each get their own row.
///
/// # Errors
///
/// Returns [`TableError::DuplicateColumn`] if the clinical table already
/// has a feature column.
pub fn join(clinical: &ClinicalTable, features: &FeatureTable) -> Result<CombinedTable, TableError> {
    let schema = combined_schema(clinical.schema())?;
    let records = clinical
        .records()
        .iter()
        .filter_map(|record| {
            let found = features.get(&record.subject)?;
            Some(combine(&record.subject, &record.values, found))
        })
        .collect();
    Ok(CombinedTable { schema, records })
}

/// Same join driven from the feature side; rows follow subject order.
pub fn join_features(
    features: &FeatureTable,
    clinical: &ClinicalTable,
) -> Result<CombinedTable, TableError> {
    let schema = combined_schema(clinical.schema())?;
    let mut records = Vec::new();
    for (subject, found) in features.iter() {
        records.extend(
            clinical
                .records()
                .iter()
                .filter(|record| record.subject == subject)
                .map(|record| combine(subject, &record.values, found)),
        );
    }
    Ok(CombinedTable { schema, records })
}

fn combined_schema(clinical: &Schema) -> Result<Schema, TableError> {
    let mut schema = clinical.clone();
    for name in FeatureTable::COLUMNS {
        schema.push(Column::new(name, ColumnType::Float))?;
    }
    Ok(schema)
}

fn combine(subject: &str, clinical: &[CellValue], features: &IntensityFeatures) -> CombinedRecord {
    let mut values = Vec::with_capacity(clinical.len() + FeatureTable::COLUMNS.len());
    values.extend_from_slice(clinical);
    values.push(CellValue::Float(features.mean));
    values.push(CellValue::Float(features.std));
    CombinedRecord {
        subject: subject.to_string(),
        values,
    }
}

impl CombinedTable {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[CombinedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self, n: usize) -> &[CombinedRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn value<'a>(&self, record: &'a CombinedRecord, column: &str) -> Option<&'a CellValue> {
        self.schema
            .index_of(column)
            .and_then(|idx| record.values.get(idx))
    }

    pub fn mean_intensity(&self, record: &CombinedRecord) -> Option<f64> {
        self.value(record, MEAN_INTENSITY).and_then(CellValue::as_f64)
    }

    pub fn std_intensity(&self, record: &CombinedRecord) -> Option<f64> {
        self.value(record, STD_INTENSITY).and_then(CellValue::as_f64)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(
            std::iter::once(SUBJECT).chain(self.schema.columns().iter().map(|c| c.name.as_str())),
        )?;
        for record in &self.records {
            writer.write_record(
                std::iter::once(record.subject.clone())
                    .chain(record.values.iter().map(ToString::to_string)),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

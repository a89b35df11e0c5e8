use crate::{
    features::MEAN_INTENSITY,
    join::{CombinedRecord, CombinedTable},
    table::{CellValue, SUBJECT, TableError},
};

use std::{collections::BTreeMap, fmt};

/// Formatting options for [`CohortReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Rows of the combined table shown verbatim.
    pub head_rows: usize,
    /// Decimals for floating point values.
    pub precision: usize,
    pub required_columns: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            head_rows: 5,
            precision: 2,
            required_columns: ["Age", "Sex", "Group", MEAN_INTENSITY]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Summary {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Textual summary of a combined clinical/feature table.
#[derive(Debug, Clone)]
pub struct CohortReport {
    config: ReportConfig,
    header: Vec<String>,
    head: Vec<Vec<CellValue>>,
    rows: usize,
    age: Option<Summary>,
    sex_counts: BTreeMap<String, usize>,
    group_counts: BTreeMap<String, usize>,
    intensity_by_group: BTreeMap<String, Summary>,
}

impl CohortReport {
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] for the first required column
    /// the table lacks.
    pub fn build(combined: &CombinedTable, config: &ReportConfig) -> Result<Self, TableError> {
        combined.schema().require(config.required_columns.as_slice())?;

        let text = |record: &CombinedRecord, column: &str| {
            combined
                .value(record, column)
                .filter(|v| !v.is_null())
                .map(ToString::to_string)
        };
        let number = |record: &CombinedRecord, column: &str| {
            combined.value(record, column).and_then(CellValue::as_f64)
        };

        let mut sex_counts = BTreeMap::new();
        let mut group_counts = BTreeMap::new();
        let mut intensities: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in combined.records() {
            if let Some(sex) = text(record, "Sex") {
                *sex_counts.entry(sex).or_insert(0) += 1;
            }
            if let Some(group) = text(record, "Group") {
                *group_counts.entry(group.clone()).or_insert(0) += 1;
                if let Some(mean) = number(record, MEAN_INTENSITY) {
                    intensities.entry(group).or_default().push(mean);
                }
            }
        }

        let header = std::iter::once(SUBJECT.to_string())
            .chain(combined.schema().columns().iter().map(|c| c.name.clone()))
            .collect();
        let head = combined
            .head(config.head_rows)
            .iter()
            .map(|record| {
                std::iter::once(CellValue::Text(record.subject.clone()))
                    .chain(record.values.iter().cloned())
                    .collect()
            })
            .collect();

        Ok(Self {
            config: config.clone(),
            header,
            head,
            rows: combined.len(),
            age: Summary::from_values(combined.records().iter().filter_map(|r| number(r, "Age"))),
            sex_counts,
            group_counts,
            intensity_by_group: intensities
                .into_iter()
                .filter_map(|(group, values)| Some((group, Summary::from_values(values)?)))
                .collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn age(&self) -> Option<Summary> {
        self.age
    }

    pub fn sex_counts(&self) -> &BTreeMap<String, usize> {
        &self.sex_counts
    }

    pub fn group_counts(&self) -> &BTreeMap<String, usize> {
        &self.group_counts
    }

    pub fn intensity_by_group(&self) -> &BTreeMap<String, Summary> {
        &self.intensity_by_group
    }
}

impl fmt::Display for CohortReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.config.precision;

        writeln!(f, "Combined records: {}", self.rows)?;
        if !self.head.is_empty() {
            writeln!(f, "{}", self.header.join("\t"))?;
            for row in &self.head {
                let cells: Vec<String> = row.iter().map(|c| format!("{c:.p$}")).collect();
                writeln!(f, "{}", cells.join("\t"))?;
            }
        }

        match self.age {
            Some(age) => writeln!(
                f,
                "Age: mean {:.p$}, min {:.p$}, max {:.p$} (n = {})",
                age.mean, age.min, age.max, age.count
            )?,
            None => writeln!(f, "Age: no values")?,
        }

        writeln!(f, "Sex:")?;
        for (sex, count) in &self.sex_counts {
            writeln!(f, "  {sex}: {count}")?;
        }
        writeln!(f, "Group:")?;
        for (group, count) in &self.group_counts {
            writeln!(f, "  {group}: {count}")?;
        }
        writeln!(f, "Mean intensity by group:")?;
        for (group, summary) in &self.intensity_by_group {
            writeln!(
                f,
                "  {group}: {:.p$} [{:.p$}, {:.p$}]",
                summary.mean, summary.min, summary.max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clinical::ClinicalTable,
        features::{FeatureTable, IntensityFeatures},
        join::join,
    };

    fn combined(csv: &str) -> CombinedTable {
        let clinical = ClinicalTable::from_reader(csv.as_bytes()).unwrap();
        let mut features = FeatureTable::default();
        for (id, mean) in [("A", 100.0), ("B", 200.0), ("C", 400.0)] {
            features.insert(id, IntensityFeatures { mean, std: 1.0 });
        }
        join(&clinical, &features).unwrap()
    }

    #[test]
    fn summarizes_groups_and_ages() {
        let table = combined("Subject,Age,Sex,Group\nA,70,F,CN\nB,80,M,AD\nC,90,F,AD\n");
        let report = CohortReport::build(&table, &ReportConfig::default()).unwrap();

        assert_eq!(report.rows(), 3);
        assert_eq!(
            report.age(),
            Some(Summary {
                count: 3,
                mean: 80.0,
                min: 70.0,
                max: 90.0
            })
        );
        assert_eq!(report.sex_counts()["F"], 2);
        assert_eq!(report.group_counts()["AD"], 2);
        assert_eq!(report.intensity_by_group()["AD"].mean, 300.0);
        assert_eq!(report.intensity_by_group()["CN"].count, 1);
    }

    #[test]
    fn missing_required_column_is_named() {
        let table = combined("Subject,Age,Sex\nA,70,F\n");
        let err = CohortReport::build(&table, &ReportConfig::default()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "Group"));
    }

    #[test]
    fn rendering_follows_the_config() {
        let table = combined("Subject,Age,Sex,Group\nA,70,F,CN\nB,80,M,AD\n");
        let config = ReportConfig {
            head_rows: 1,
            precision: 1,
            ..ReportConfig::default()
        };
        let text = CohortReport::build(&table, &config).unwrap().to_string();

        assert!(text.contains("Combined records: 2"));
        assert!(text.contains("Subject\tAge\tSex\tGroup\tMean_Intensity\tStd_Intensity"));
        assert!(text.contains("A\t70\tF\tCN\t100.0\t1.0"));
        assert!(!text.contains("B\t80"));
        assert!(text.contains("Age: mean 75.0, min 70.0, max 80.0 (n = 2)"));
        assert!(text.contains("  AD: 200.0 [200.0, 200.0]"));
    }
}

use clap::ValueEnum;

/// Attribute a slice's position along the stacking axis is read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    /// Third component of Image Position (Patient)
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
}

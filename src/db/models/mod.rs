pub mod dataset;
pub mod field_type;
pub mod heuristic;

pub use dataset::{AutofillDataset, DatasetWithFilledFields, FilledField};
pub use field_type::{
    DefaultFieldTypeWithHints, FakeData, FieldType, FieldTypeWithHints, PARTITIONS,
    PARTITION_ADDRESS, PARTITION_ALL, PARTITION_CREDIT_CARD, PARTITION_EMAIL, PARTITION_OTHER,
};
pub use heuristic::ResourceIdHeuristic;

pub mod catalog;
pub mod collection;
pub mod dataset;
pub mod hints;
pub mod parser;
pub mod response;
pub mod structure;
pub mod value;

pub use catalog::{FieldCatalog, FieldDescriptor, FieldKind};
pub use collection::SavedValueCollection;
pub use dataset::{Dataset, DatasetBuilder, FieldFill, FillValue};
pub use hints::SaveType;
pub use parser::StructureParser;
pub use response::{FillResponse, SaveInfo};
pub use structure::{AutofillId, RawValue, ScreenStructure, ViewNode};
pub use value::SavedValue;

use serde::{Deserialize, Serialize};

/// Field type a package's view is known to hold, keyed by its resource id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdHeuristic {
    pub resource_id: String,
    pub package_name: String,
    pub field_type_name: String,
}

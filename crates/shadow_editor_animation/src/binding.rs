// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binding of a clip to the object it animates.

use serde::{Deserialize, Serialize};

/// Binding of a clip to a scene object and, optionally, one of its properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetBinding {
    /// Target object identifier
    pub object: String,
    /// Property path within the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
}

impl TargetBinding {
    /// Bind to a whole object
    pub fn object(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            property_path: None,
        }
    }

    /// Bind to a property of an object
    pub fn property(object: impl Into<String>, property_path: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            property_path: Some(property_path.into()),
        }
    }
}

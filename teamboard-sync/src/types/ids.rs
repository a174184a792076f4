//! Typed string identifiers
//!
//! Remote documents are addressed by opaque strings. Wrapping them keeps a column id
//! from being passed where a task id is expected. An empty id means "not known yet"
//! and makes the enclosing scope unresolvable.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh ULID-based id
            pub fn new() -> Self {
                Self(ulid::Ulid::new().to_string())
            }

            /// Wrap an existing id
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&String> for $name {
            fn from(id: &String) -> Self {
                Self(id.clone())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Team document id
    TeamId
);
define_id!(
    /// Board document id (scoped to a team)
    BoardId
);
define_id!(
    /// Column document id (scoped to a board)
    ColumnId
);
define_id!(
    /// Task document id (scoped to a column; changes when the task moves)
    TaskId
);
define_id!(
    /// Checklist item document id (scoped to a task)
    ChecklistItemId
);
define_id!(
    /// User document id, as issued by the auth provider
    UserId
);
define_id!(
    /// Idempotency token carried by a task copy during a cross-column move
    MoveToken
);

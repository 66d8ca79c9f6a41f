//! Registration priority of evolution functions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tie-break rule between evolution functions registered for the same slot
///
/// `UserDefined` always wins over `AutoGenerated`, regardless of the order
/// in which both were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Emitted by the code generator (usually a no-op)
    AutoGenerated,
    /// Written by hand for a layout change
    UserDefined,
}

impl Priority {
    /// Stable lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::AutoGenerated => "auto_generated",
            Priority::UserDefined => "user_defined",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_defined_ranks_higher() {
        assert!(Priority::UserDefined > Priority::AutoGenerated);
        assert_eq!(Priority::UserDefined.to_string(), "user_defined");
    }
}

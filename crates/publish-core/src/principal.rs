//! Authenticated principal

use serde::{Deserialize, Serialize};

/// The user a request executes on behalf of
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Numeric user ID
    pub id: u64,
    /// Address of the SDK instance assigned to this user
    pub sdk_address: Option<String>,
}

impl Principal {
    pub fn new(id: u64, sdk_address: Option<String>) -> Self {
        Self { id, sdk_address }
    }

    /// SDK address, treating an empty string as unassigned
    pub fn sdk_address(&self) -> Option<&str> {
        self.sdk_address.as_deref().filter(|addr| !addr.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sdk_address_is_unassigned() {
        assert_eq!(Principal::new(1, Some(String::new())).sdk_address(), None);
        assert_eq!(Principal::new(1, None).sdk_address(), None);
        assert_eq!(
            Principal::new(1, Some("http://sdk:5279".into())).sdk_address(),
            Some("http://sdk:5279")
        );
    }
}

use serde::{Deserialize, Serialize};

/// Capability granted to an actor.
///
/// A closed set: the report workflow only distinguishes authorship, review
/// and billing administration. Mapping roles (pathologist, lab tech, billing
/// clerk) onto capabilities is policy, decided outside the core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Author/edit reports and their versions.
    Edit,
    /// Review, approve, sign and retract reports.
    Review,
    /// Billing administration; bypasses the PDF billing lock.
    AdminBilling,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Edit => "edit",
            Capability::Review => "review",
            Capability::AdminBilling => "admin_billing",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

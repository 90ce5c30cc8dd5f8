use serde::{Deserialize, Serialize};

/// Panel address and username collected so far by the configuration
/// dialogue; the password arrives in the final step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelDraft {
    /// Panel address, host:port.
    pub domain: String,
    /// Panel admin username.
    pub username: String,
}

/// Represents the current state of an admin dialogue.
#[derive(Clone, Serialize, Deserialize, Default)]
pub enum State {
    /// No conversation in progress.
    #[default]
    Idle,
    /// Waiting for yes/no before overwriting existing panel config.
    AwaitingReconfigureConfirm,
    /// Waiting for the panel address.
    AwaitingPanelDomain,
    /// Waiting for the panel username.
    AwaitingPanelUsername(String),
    /// Waiting for the panel password.
    AwaitingPanelPassword(PanelDraft),
    /// Waiting for the username a special limit applies to.
    AwaitingSpecialLimitUser,
    /// Waiting for the special limit value.
    AwaitingSpecialLimitValue(String),
    /// Waiting for a new admin chat ID.
    AwaitingAdminId,
    /// Waiting for the admin chat ID to remove.
    AwaitingAdminIdToRemove,
    /// Waiting for a username to exempt from limits.
    AwaitingExceptUser,
    /// Waiting for the exempt username to remove.
    AwaitingExceptUserToRemove,
    /// Waiting for the general limit value.
    AwaitingGeneralLimit,
    /// Waiting for the check interval in seconds.
    AwaitingCheckInterval,
    /// Waiting for the active-user window in seconds.
    AwaitingTimeToActive,
    /// Waiting for a country code selection.
    AwaitingCountryCode,
}

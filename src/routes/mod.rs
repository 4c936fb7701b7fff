/// Router Module Index
///
/// Routes are grouped by the access they need. Grouping is documentation only: the gate decides
/// access from the configured matcher and privileged prefix, not from which group a route is in.

/// Routes open to anonymous callers, including both redirect targets.
pub mod public;

/// Routes any authenticated principal may reach.
pub mod authenticated;

/// Routes under the privileged prefix, reserved for allow-listed identities.
pub mod admin;

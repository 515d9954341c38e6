/// Router Module Index
///
/// Groups the gateway's routes by the treatment the edge guard gives them. The
/// guard itself is one layer over the whole router; these modules only decide
/// which handlers exist.

/// Routes matched by the public prefix list (plus the health probe).
pub mod public;

/// Routes that need an unexpired token.
pub mod authenticated;

/// Routes under the admin prefix; the guard admits only ADMIN and SUPERADMIN.
pub mod admin;

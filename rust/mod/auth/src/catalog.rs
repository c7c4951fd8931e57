//! Permission codes known to the dashboard.
//!
//! Codes are `<domain>.<action>`. Administrators are usually granted
//! [`crate::WILDCARD`] instead of the full list.

pub const ALERTES_READ: &str = "alertes.read";
pub const ALERTES_MANAGE: &str = "alertes.manage";
pub const ALERTES_TRIGGER: &str = "alertes.trigger";
pub const NOTIFICATIONS_READ: &str = "notifications.read";

pub const MARCHES_READ: &str = "marches.read";
pub const MARCHES_CREATE: &str = "marches.create";
pub const MARCHES_UPDATE: &str = "marches.update";
pub const MARCHES_DELETE: &str = "marches.delete";

pub const TRESORERIE_READ: &str = "tresorerie.read";
pub const TRESORERIE_MANAGE: &str = "tresorerie.manage";

pub const PROFIL_READ: &str = "profil.read";
pub const PROFIL_UPDATE: &str = "profil.update";

pub const UTILISATEURS_MANAGE: &str = "utilisateurs.manage";

/// Every code above, for permission pickers and validation.
pub const ALL: &[&str] = &[
    ALERTES_READ,
    ALERTES_MANAGE,
    ALERTES_TRIGGER,
    NOTIFICATIONS_READ,
    MARCHES_READ,
    MARCHES_CREATE,
    MARCHES_UPDATE,
    MARCHES_DELETE,
    TRESORERIE_READ,
    TRESORERIE_MANAGE,
    PROFIL_READ,
    PROFIL_UPDATE,
    UTILISATEURS_MANAGE,
];

/// Whether `code` is a catalog entry or the wildcard.
pub fn is_known(code: &str) -> bool {
    code == crate::WILDCARD || ALL.contains(&code)
}

/// Codes in `set` that this build does not define. They never satisfy a
/// check, which usually means a typo or a newer session provider.
pub fn unknown_codes(set: &crate::PermissionSet) -> Vec<&str> {
    set.iter().filter(|code| !is_known(code)).collect()
}

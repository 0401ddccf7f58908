//! Static role→permission table.
//!
//! Lookup supports `*` wildcards on resource and action, plus a scope gate:
//! a permission granted with [`Scope::Own`] only covers the caller's own
//! records, while [`Scope::All`] covers everything.

use serde::{Deserialize, Serialize};

/// Caller roles on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Merchant,
    Driver,
    Admin,
}

/// Whether an operation targets the caller's own records or anyone's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Own,
    All,
}

struct Permission {
    resource: &'static str,
    action: &'static str,
    scope: Scope,
}

const fn perm(resource: &'static str, action: &'static str, scope: Scope) -> Permission {
    Permission { resource, action, scope }
}

static CUSTOMER_PERMISSIONS: &[Permission] = &[
    perm("orders", "create", Scope::Own),
    perm("orders", "read", Scope::Own),
    perm("orders", "cancel", Scope::Own),
    perm("payments", "create", Scope::Own),
    perm("addresses", "*", Scope::Own),
    perm("profile", "*", Scope::Own),
    perm("merchants", "read", Scope::All),
    perm("menu", "read", Scope::All),
];

static MERCHANT_PERMISSIONS: &[Permission] = &[
    perm("menu", "*", Scope::Own),
    perm("orders", "read", Scope::Own),
    perm("orders", "update", Scope::Own),
    perm("profile", "*", Scope::Own),
    perm("payouts", "read", Scope::Own),
];

static DRIVER_PERMISSIONS: &[Permission] = &[
    perm("deliveries", "read", Scope::Own),
    perm("deliveries", "update", Scope::Own),
    perm("location", "update", Scope::Own),
    perm("profile", "*", Scope::Own),
    perm("earnings", "read", Scope::Own),
];

static ADMIN_PERMISSIONS: &[Permission] = &[perm("*", "*", Scope::All)];

fn table(role: Role) -> &'static [Permission] {
    match role {
        Role::Customer => CUSTOMER_PERMISSIONS,
        Role::Merchant => MERCHANT_PERMISSIONS,
        Role::Driver => DRIVER_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    }
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

/// Check whether `role` may perform `action` on `resource` at the requested
/// scope. A permission scoped to `all` also covers `own` requests; a
/// permission scoped to `own` never covers an `all` request.
pub fn has_permission(role: Role, resource: &str, action: &str, scope: Scope) -> bool {
    table(role).iter().any(|p| {
        pattern_matches(p.resource, resource)
            && pattern_matches(p.action, action)
            && (p.scope == Scope::All || scope == Scope::Own)
    })
}

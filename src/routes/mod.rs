/// Router Module Index
///
/// Routing split by access level. Each module maps to one class of caller.

/// Routes open to everyone. Catalog handlers gate content per viewer.
pub mod public;

/// Routes behind the `AuthUser` middleware layer.
pub mod authenticated;

/// Routes nested under `/admin`; handlers check the admin role.
pub mod admin;

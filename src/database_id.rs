//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;
/// Database identifier for a person.
pub type PersonId = DatabaseId;
/// Database identifier for a cost type.
pub type CostTypeId = DatabaseId;
/// Database identifier for a role.
pub type RoleId = DatabaseId;

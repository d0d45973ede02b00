//! Permission strings used to gate route groups.

// Catalogue
pub const MEALS_READ: &str = "meals:read";
pub const MEALS_MANAGE: &str = "meals:manage";

// Customer accounts
pub const CUSTOMERS_READ: &str = "customers:read";
pub const CUSTOMERS_UPDATE: &str = "customers:update";
pub const CUSTOMERS_TOPUP: &str = "customers:topup";

// Orders
pub const ORDERS_READ: &str = "orders:read";
pub const ORDERS_CREATE: &str = "orders:create";
pub const ORDERS_DELETE: &str = "orders:delete";

// User administration
pub const USERS_MANAGE: &str = "users:manage";

//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/persons/{person_id}', use [format_endpoint].

/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/log_in";
/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/auth/log_out";
/// The route for changing the logged in user's password.
pub const CHANGE_PASSWORD: &str = "/api/auth/change_password";

/// The route to list permissions.
pub const PERMISSIONS: &str = "/api/permissions";
/// The route to access a single permission.
pub const PERMISSION: &str = "/api/permissions/{permission_id}";

/// The route to access roles.
pub const ROLES: &str = "/api/roles";
/// The route to access a single role.
pub const ROLE: &str = "/api/roles/{role_id}";
/// The route to replace the permissions of a role.
pub const ROLE_PERMISSIONS: &str = "/api/roles/permissions";

/// The route to access users.
pub const USERS: &str = "/api/users";
/// The route to access a single user.
pub const USER: &str = "/api/users/{user_id}";
/// The route to replace the roles of a user.
pub const USER_ROLES: &str = "/api/users/roles";
/// The route for the logged in user.
pub const ME: &str = "/api/users/me";
/// The route for the logged in user's permissions.
pub const MY_PERMISSIONS: &str = "/api/users/me/permissions";

/// The route to access persons.
pub const PERSONS: &str = "/api/persons";
/// The route to access a single person.
pub const PERSON: &str = "/api/persons/{person_id}";
/// The route for a person's balance over all their transactions.
pub const PERSON_BALANCE: &str = "/api/persons/{person_id}/balance";
/// The route for a person's transactions within a date range.
pub const PERSON_TRANSACTIONS: &str = "/api/persons/{person_id}/transactions";

/// The route to access cost types.
pub const COST_TYPES: &str = "/api/cost_types";
/// The route to access a single cost type.
pub const COST_TYPE: &str = "/api/cost_types/{cost_type_id}";

/// The route to access transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for the most recent transactions.
pub const LAST_TRANSACTIONS: &str = "/api/transactions/last/{count}";
/// The route for transaction name suggestions.
pub const AUTOCOMPLETE: &str = "/api/transactions/autocomplete";
/// The route for filtered, sorted and paginated transaction queries.
pub const QUERY_TRANSACTIONS: &str = "/api/transactions/query";
/// The route for editing many transactions at once.
pub const BULK_EDIT: &str = "/api/transactions/bulk";
/// The route for adding cost types to transactions by keyword.
pub const APPLY_COST_TYPES: &str = "/api/transactions/apply_cost_types";
/// The route to upload CSV files for importing transactions.
pub const IMPORT: &str = "/api/transactions/import";

/// The route for all report data over a date range.
pub const REPORT_SUMMARY: &str = "/api/reports/summary";
/// The route for total income, expenses and balance over a date range.
pub const FINANCIAL_SUMMARY: &str = "/api/reports/financial_summary";
/// The route for the per-day series.
pub const DAILY_SERIES: &str = "/api/reports/daily";
/// The route for expense totals per cost type.
pub const EXPENSES_BY_CATEGORY: &str = "/api/reports/expenses_by_category";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };
    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

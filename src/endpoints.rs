//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/edit-expense/{expense_id}', use [format_endpoint].

/// The route for registering a new user.
pub const REGISTER: &str = "/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The route for checking the session and fetching the current user.
pub const IS_AUTHENTICATED: &str = "/is-authenticated";
/// The route to create an expense.
pub const ADD_EXPENSE: &str = "/add-expense";
/// The route to update an expense.
pub const EDIT_EXPENSE: &str = "/edit-expense/{expense_id}";
/// The route to delete an expense.
pub const DELETE_EXPENSE: &str = "/delete-expense/{expense_id}";
/// The route to create an income.
pub const ADD_INCOME: &str = "/add-income";
/// The route to update an income.
pub const EDIT_INCOME: &str = "/edit-income/{income_id}";
/// The route to delete an income.
pub const DELETE_INCOME: &str = "/delete-income/{income_id}";
/// The route for the totals and category breakdown of the current user.
pub const SUMMARY: &str = "/summary";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter starts with a left brace and ends with the next right brace.
/// For example, in the endpoint path '/edit-income/{income_id}', '{income_id}' is the parameter.
///
/// Only the first parameter is replaced. If no parameter is found in
/// `endpoint_path`, the function returns the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

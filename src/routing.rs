//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    auth::{
        auth_guard, change_password_endpoint, log_in_endpoint, log_out_endpoint,
        register_endpoint,
    },
    cost_type::{
        create_cost_type_endpoint, delete_cost_type_endpoint, get_cost_type_endpoint,
        list_cost_types_endpoint, update_cost_type_endpoint,
    },
    endpoints,
    permission::{Permission, get_permission_endpoint, list_permissions_endpoint, require},
    person::{
        create_person_endpoint, delete_person_endpoint, get_person_balance_endpoint,
        get_person_endpoint, get_person_transactions_endpoint, list_persons_endpoint,
        update_person_endpoint,
    },
    report::{
        get_daily_series_endpoint, get_expenses_by_category_endpoint,
        get_financial_summary_endpoint, get_report_summary_endpoint,
    },
    role::{
        create_role_endpoint, delete_role_endpoint, get_role_endpoint, list_roles_endpoint,
        set_role_permissions_endpoint, update_role_endpoint,
    },
    transaction::{
        apply_cost_types_endpoint, autocomplete_endpoint, bulk_edit_endpoint,
        create_transaction_endpoint, delete_transaction_endpoint, get_last_transactions_endpoint,
        get_transaction_endpoint, import_transactions_endpoint, list_transactions_endpoint,
        query_transactions_endpoint, update_transaction_endpoint,
    },
    user::{
        create_user_endpoint, delete_user_endpoint, get_me_endpoint, get_my_permissions_endpoint,
        get_user_endpoint, list_users_endpoint, set_user_roles_endpoint, update_user_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route except logging in, registering and logging out requires a
/// session. Most protected routes also require a single permission.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::LOG_OUT, post(log_out_endpoint));

    let s = &state;
    let protected_routes = Router::new()
        .route(endpoints::CHANGE_PASSWORD, post(change_password_endpoint))
        .route(endpoints::ME, get(get_me_endpoint))
        .route(endpoints::MY_PERMISSIONS, get(get_my_permissions_endpoint))
        .route(
            endpoints::PERMISSIONS,
            require(Permission::ManagePermissions, get(list_permissions_endpoint), s),
        )
        .route(
            endpoints::PERMISSION,
            require(Permission::ManagePermissions, get(get_permission_endpoint), s),
        )
        .route(
            endpoints::ROLES,
            require(Permission::ViewRoles, get(list_roles_endpoint), s)
                .merge(require(Permission::CreateRole, post(create_role_endpoint), s)),
        )
        .route(
            endpoints::ROLE_PERMISSIONS,
            require(Permission::EditRole, put(set_role_permissions_endpoint), s),
        )
        .route(
            endpoints::ROLE,
            require(Permission::ViewRoles, get(get_role_endpoint), s)
                .merge(require(Permission::EditRole, put(update_role_endpoint), s))
                .merge(require(Permission::DeleteRole, delete(delete_role_endpoint), s)),
        )
        .route(
            endpoints::USERS,
            require(Permission::ViewUsers, get(list_users_endpoint), s)
                .merge(require(Permission::CreateUser, post(create_user_endpoint), s)),
        )
        .route(
            endpoints::USER_ROLES,
            require(Permission::EditUser, put(set_user_roles_endpoint), s),
        )
        .route(
            endpoints::USER,
            require(Permission::ViewUsers, get(get_user_endpoint), s)
                .merge(require(Permission::EditUser, put(update_user_endpoint), s))
                .merge(require(Permission::DeleteUser, delete(delete_user_endpoint), s)),
        )
        .route(
            endpoints::PERSONS,
            require(Permission::ViewPersons, get(list_persons_endpoint), s)
                .merge(require(Permission::CreatePerson, post(create_person_endpoint), s)),
        )
        .route(
            endpoints::PERSON,
            require(Permission::ViewPersons, get(get_person_endpoint), s)
                .merge(require(Permission::EditPerson, put(update_person_endpoint), s))
                .merge(require(Permission::DeletePerson, delete(delete_person_endpoint), s)),
        )
        .route(
            endpoints::PERSON_BALANCE,
            require(Permission::ViewPersons, get(get_person_balance_endpoint), s),
        )
        .route(
            endpoints::PERSON_TRANSACTIONS,
            require(Permission::ViewPersons, get(get_person_transactions_endpoint), s),
        )
        .route(
            endpoints::COST_TYPES,
            require(Permission::ViewCostTypes, get(list_cost_types_endpoint), s).merge(require(
                Permission::CreateCostType,
                post(create_cost_type_endpoint),
                s,
            )),
        )
        .route(
            endpoints::COST_TYPE,
            require(Permission::ViewCostTypes, get(get_cost_type_endpoint), s)
                .merge(require(Permission::EditCostType, put(update_cost_type_endpoint), s))
                .merge(require(
                    Permission::DeleteCostType,
                    delete(delete_cost_type_endpoint),
                    s,
                )),
        )
        .route(
            endpoints::TRANSACTIONS,
            require(Permission::ViewTransactions, get(list_transactions_endpoint), s).merge(
                require(
                    Permission::CreateTransaction,
                    post(create_transaction_endpoint),
                    s,
                ),
            ),
        )
        .route(
            endpoints::TRANSACTION,
            require(Permission::ViewTransactions, get(get_transaction_endpoint), s)
                .merge(require(
                    Permission::EditTransaction,
                    put(update_transaction_endpoint),
                    s,
                ))
                .merge(require(
                    Permission::DeleteTransaction,
                    delete(delete_transaction_endpoint),
                    s,
                )),
        )
        .route(
            endpoints::LAST_TRANSACTIONS,
            require(
                Permission::ViewTransactions,
                get(get_last_transactions_endpoint),
                s,
            ),
        )
        .route(
            endpoints::AUTOCOMPLETE,
            require(Permission::ViewTransactions, get(autocomplete_endpoint), s),
        )
        .route(
            endpoints::QUERY_TRANSACTIONS,
            require(
                Permission::ViewTransactions,
                post(query_transactions_endpoint),
                s,
            ),
        )
        .route(
            endpoints::BULK_EDIT,
            require(Permission::EditTransaction, post(bulk_edit_endpoint), s),
        )
        .route(
            endpoints::APPLY_COST_TYPES,
            require(Permission::EditTransaction, post(apply_cost_types_endpoint), s),
        )
        .route(
            endpoints::IMPORT,
            require(
                Permission::CreateTransaction,
                post(import_transactions_endpoint),
                s,
            ),
        )
        .route(
            endpoints::REPORT_SUMMARY,
            require(Permission::ViewTransactions, get(get_report_summary_endpoint), s),
        )
        .route(
            endpoints::FINANCIAL_SUMMARY,
            require(
                Permission::ViewTransactions,
                get(get_financial_summary_endpoint),
                s,
            ),
        )
        .route(
            endpoints::DAILY_SERIES,
            require(Permission::ViewTransactions, get(get_daily_series_endpoint), s),
        )
        .route(
            endpoints::EXPENSES_BY_CATEGORY,
            require(
                Permission::ViewTransactions,
                get(get_expenses_by_category_endpoint),
                s,
            ),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .with_state(state)
}

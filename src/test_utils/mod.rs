#![allow(missing_docs)]

pub(crate) mod db;
pub(crate) mod http;

pub(crate) use db::{
    TEST_PASSWORD, create_test_user, get_test_db_connection, grant_permissions, new_test_user,
};
pub(crate) use http::{assert_content_type, parse_error_body, parse_json_body};

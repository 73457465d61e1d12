pub mod postgres;
pub mod trips;

pub use postgres::{copy_in_sql, create_table_sql, drop_table_sql, pg_type, quote_ident};
pub use trips::{trip_schema, TRIP_COLUMNS};

//! SeaORM entity definitions for the record store.

pub mod prelude;
pub mod record;
pub mod record_field;

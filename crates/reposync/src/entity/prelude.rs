pub use super::record::{
    ActiveModel as RecordActiveModel, Column as RecordColumn, Entity as Record,
    Model as RecordModel,
};
pub use super::record_field::{
    ActiveModel as RecordFieldActiveModel, Column as RecordFieldColumn, Entity as RecordField,
    Model as RecordFieldModel,
};

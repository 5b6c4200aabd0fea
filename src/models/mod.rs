mod entity;
mod user;

pub use entity::{utc_now, Audited, Entity};
pub use user::{
    NewUserRecord, User, UserColumn, UserField, UserFieldChanges, UserFilter, UserRecordChanges,
};

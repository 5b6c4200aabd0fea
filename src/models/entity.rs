//! Capability traits shared by every persisted record.
//!
//! The generic repository and unit-of-work layers are written against these
//! traits instead of concrete models, so a new table only needs a model that
//! implements [`Entity`] and [`Audited`].

use std::fmt::{Debug, Display};

use jiff::civil::DateTime;
use jiff::tz::TimeZone;

/// A record with a unique key and typed query vocabulary.
///
/// `Column`, `Filter` and `Field` replace stringly-typed column names: a
/// repository can only be asked to select, filter or assign things the model
/// declares.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Primary key type.
    type Key: Copy + Ord + Display + Debug + Send + Sync + 'static;
    /// Column identifiers usable in a column selection.
    type Column: Copy + Eq + Debug + Send + Sync + 'static;
    /// Predicates usable as query filters.
    type Filter: Clone + Debug + Send + Sync + 'static;
    /// Single-column assignments usable in partial updates.
    type Field: Clone + Debug + Send + Sync + 'static;

    /// Human-readable entity name used in error messages.
    const NAME: &'static str;

    fn key(&self) -> Self::Key;

    fn set_key(&mut self, key: Self::Key);

    /// Evaluates a filter against an in-memory record.
    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Copies one column's value from `source` into `self`.
    fn copy_column(&mut self, source: &Self, column: Self::Column);

    /// Applies a single field assignment to `self`.
    fn apply_field(&mut self, field: &Self::Field);
}

/// A record carrying creation, modification and soft-delete timestamps.
pub trait Audited {
    fn created_at(&self) -> DateTime;

    fn set_created_at(&mut self, at: DateTime);

    fn updated_at(&self) -> DateTime;

    fn set_updated_at(&mut self, at: DateTime);

    fn deleted_at(&self) -> Option<DateTime>;

    fn set_deleted_at(&mut self, at: Option<DateTime>);

    /// Live records have never been soft-deleted.
    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

/// Current wall-clock time as a UTC civil datetime, the representation stored
/// in `TIMESTAMP` columns.
pub fn utc_now() -> DateTime {
    jiff::Timestamp::now().to_zoned(TimeZone::UTC).datetime()
}

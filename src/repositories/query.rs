//! Declarative query options accepted by repository operations.

use crate::models::{Audited, Entity};

/// A single modifier applied to one repository call.
///
/// Options compose: several filters are AND-ed, several selections are
/// merged, and `Unscoped` lifts the default restriction to live records.
pub enum QueryOption<E: Entity> {
    /// Restrict the result to records matching the predicate.
    Filter(E::Filter),
    /// Only the listed columns are written into the caller's output record.
    Select(Vec<E::Column>),
    /// Include soft-deleted records.
    Unscoped,
}

impl<E: Entity> QueryOption<E> {
    pub fn filter(filter: E::Filter) -> Self {
        QueryOption::Filter(filter)
    }

    pub fn select(columns: impl IntoIterator<Item = E::Column>) -> Self {
        QueryOption::Select(columns.into_iter().collect())
    }

    pub fn unscoped() -> Self {
        QueryOption::Unscoped
    }
}

impl<E: Entity> Clone for QueryOption<E> {
    fn clone(&self) -> Self {
        match self {
            QueryOption::Filter(filter) => QueryOption::Filter(filter.clone()),
            QueryOption::Select(columns) => QueryOption::Select(columns.clone()),
            QueryOption::Unscoped => QueryOption::Unscoped,
        }
    }
}

impl<E: Entity> std::fmt::Debug for QueryOption<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOption::Filter(filter) => f.debug_tuple("Filter").field(filter).finish(),
            QueryOption::Select(columns) => f.debug_tuple("Select").field(columns).finish(),
            QueryOption::Unscoped => f.write_str("Unscoped"),
        }
    }
}

/// Options folded into the shape every backend consumes.
pub struct QueryPlan<'a, E: Entity> {
    pub filters: Vec<&'a E::Filter>,
    pub columns: Option<Vec<E::Column>>,
    pub unscoped: bool,
}

impl<'a, E: Entity> QueryPlan<'a, E> {
    pub fn new(options: &'a [QueryOption<E>]) -> Self {
        let mut plan = Self {
            filters: Vec::new(),
            columns: None,
            unscoped: false,
        };
        for option in options {
            match option {
                QueryOption::Filter(filter) => plan.filters.push(filter),
                QueryOption::Select(columns) => plan
                    .columns
                    .get_or_insert_with(Vec::new)
                    .extend(columns.iter().copied()),
                QueryOption::Unscoped => plan.unscoped = true,
            }
        }
        plan
    }

    /// Whether an in-memory record passes the scope and every filter.
    pub fn admits(&self, record: &E) -> bool
    where
        E: Audited,
    {
        (self.unscoped || record.is_live()) && self.filters.iter().all(|f| record.matches(f))
    }

    /// Writes `row` into `out`, limited to the selected columns when a
    /// selection is present.
    pub fn project(&self, row: &E, out: &mut E) {
        match &self.columns {
            Some(columns) => {
                for column in columns {
                    out.copy_column(row, *column);
                }
            }
            None => *out = row.clone(),
        }
    }
}

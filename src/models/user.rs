use diesel::prelude::*;
use jiff_diesel::{DateTime, ToDiesel};

use super::entity::{utc_now, Audited, Entity};

/// User model for reading from and writing to the `users` table.
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

impl User {
    /// Builds an unsaved user. The key is assigned on insert.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let now = utc_now().to_diesel();
        Self {
            id: 0,
            username: username.into(),
            password: password.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Builds a key-only handle used to address an existing row.
    pub fn with_id(id: i32) -> Self {
        let mut user = Self::new(String::new(), String::new());
        user.id = id;
        user
    }
}

/// Columns of `users` that can appear in a column selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    Username,
    Password,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

/// Predicates over `users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(i32),
    Username(String),
}

/// Single-column assignments for partial updates of `users`.
#[derive(Debug, Clone, PartialEq)]
pub enum UserField {
    Username(String),
    Password(String),
    UpdatedAt(jiff::civil::DateTime),
    DeletedAt(Option<jiff::civil::DateTime>),
}

impl Entity for User {
    type Key = i32;
    type Column = UserColumn;
    type Filter = UserFilter;
    type Field = UserField;

    const NAME: &'static str = "user";

    fn key(&self) -> i32 {
        self.id
    }

    fn set_key(&mut self, key: i32) {
        self.id = key;
    }

    fn matches(&self, filter: &UserFilter) -> bool {
        match filter {
            UserFilter::Id(id) => self.id == *id,
            UserFilter::Username(name) => &self.username == name,
        }
    }

    fn copy_column(&mut self, source: &Self, column: UserColumn) {
        match column {
            UserColumn::Id => self.id = source.id,
            UserColumn::Username => self.username = source.username.clone(),
            UserColumn::Password => self.password = source.password.clone(),
            UserColumn::CreatedAt => self.created_at = source.created_at,
            UserColumn::UpdatedAt => self.updated_at = source.updated_at,
            UserColumn::DeletedAt => self.deleted_at = source.deleted_at,
        }
    }

    fn apply_field(&mut self, field: &UserField) {
        match field {
            UserField::Username(name) => self.username = name.clone(),
            UserField::Password(password) => self.password = password.clone(),
            UserField::UpdatedAt(at) => self.updated_at = at.to_diesel(),
            UserField::DeletedAt(at) => self.deleted_at = at.map(|at| at.to_diesel()),
        }
    }
}

impl Audited for User {
    fn created_at(&self) -> jiff::civil::DateTime {
        self.created_at.to_jiff()
    }

    fn set_created_at(&mut self, at: jiff::civil::DateTime) {
        self.created_at = at.to_diesel();
    }

    fn updated_at(&self) -> jiff::civil::DateTime {
        self.updated_at.to_jiff()
    }

    fn set_updated_at(&mut self, at: jiff::civil::DateTime) {
        self.updated_at = at.to_diesel();
    }

    fn deleted_at(&self) -> Option<jiff::civil::DateTime> {
        self.deleted_at.map(|at| at.to_jiff())
    }

    fn set_deleted_at(&mut self, at: Option<jiff::civil::DateTime>) {
        self.deleted_at = at.map(|at| at.to_diesel());
    }
}

/// Row inserted by the repository; the key comes from the sequence.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUserRecord<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl<'a> From<&'a User> for NewUserRecord<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            username: &user.username,
            password: &user.password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Full-record changeset written by a save. `deleted_at` is not part of it:
/// soft deletion only happens through field updates.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
pub struct UserRecordChanges<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl<'a> From<&'a User> for UserRecordChanges<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            username: &user.username,
            password: &user.password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Sparse changeset built from [`UserField`] assignments.
/// `None` leaves a column untouched; `deleted_at: Some(None)` clears it.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = crate::schema::users)]
pub struct UserFieldChanges {
    pub username: Option<String>,
    pub password: Option<String>,
    pub updated_at: Option<DateTime>,
    pub deleted_at: Option<Option<DateTime>>,
}

impl UserFieldChanges {
    pub fn from_fields(fields: &[UserField]) -> Self {
        let mut changes = Self::default();
        for field in fields {
            match field {
                UserField::Username(name) => changes.username = Some(name.clone()),
                UserField::Password(password) => changes.password = Some(password.clone()),
                UserField::UpdatedAt(at) => changes.updated_at = Some(at.to_diesel()),
                UserField::DeletedAt(at) => {
                    changes.deleted_at = Some(at.map(|at| at.to_diesel()))
                }
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_column_only_touches_selected_column() {
        let mut stored = User::new("alice", "p1");
        stored.id = 7;
        stored.set_created_at(jiff::civil::date(2024, 1, 2).at(3, 4, 5, 0));

        let mut incoming = User::new("alice2", "p2");
        incoming.copy_column(&stored, UserColumn::CreatedAt);

        assert_eq!(incoming.created_at(), stored.created_at());
        assert_eq!(incoming.username, "alice2");
        assert_eq!(incoming.password, "p2");
        assert_eq!(incoming.id, 0);
    }

    #[test]
    fn test_matches_filters() {
        let mut user = User::new("bob", "secret");
        user.id = 3;

        assert!(user.matches(&UserFilter::Id(3)));
        assert!(!user.matches(&UserFilter::Id(4)));
        assert!(user.matches(&UserFilter::Username("bob".to_string())));
        assert!(!user.matches(&UserFilter::Username("Bob".to_string())));
    }

    #[test]
    fn test_apply_deleted_at_marks_record_not_live() {
        let mut user = User::new("carol", "pw");
        assert!(user.is_live());

        let at = utc_now();
        user.apply_field(&UserField::DeletedAt(Some(at)));
        assert!(!user.is_live());
        assert_eq!(user.deleted_at(), Some(at));

        user.apply_field(&UserField::DeletedAt(None));
        assert!(user.is_live());
    }

    #[test]
    fn test_field_changes_collects_assignments() {
        let at = utc_now();
        let changes = UserFieldChanges::from_fields(&[
            UserField::DeletedAt(Some(at)),
            UserField::Password("new".to_string()),
        ]);

        assert_eq!(changes.password.as_deref(), Some("new"));
        assert!(changes.username.is_none());
        assert!(changes.updated_at.is_none());
        assert!(matches!(changes.deleted_at, Some(Some(_))));
    }
}

//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error, TransactionType,
    database_id::CategoryId,
    user::{UserID, now_utc_seconds, timestamp_from_sql},
};

use super::domain::{Category, CategoryName};

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns an [Error::SqlError] if `user_id` does not refer to a user or
/// there is some other SQL error.
pub fn create_category(
    name: CategoryName,
    category_type: TransactionType,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "INSERT INTO category (name, type, user_id, created_at) VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, type, user_id, created_at",
        )?
        .query_row(
            (
                name.as_ref(),
                category_type,
                user_id.as_i64(),
                now_utc_seconds().unix_timestamp(),
            ),
            map_row,
        )?;

    tracing::debug!(
        "created {} category {} for user {user_id}",
        category.category_type,
        category.id
    );

    Ok(category)
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
/// Returns [Error::CategoryNotFound] if the category does not exist or
/// belongs to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, type, user_id, created_at FROM category
             WHERE id = ?1 AND user_id = ?2;",
        )?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound,
            error => error.into(),
        })
}

/// Retrieve all of a user's categories ordered alphabetically by name.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, type, user_id, created_at FROM category
             WHERE user_id = ?1 ORDER BY name ASC, id ASC;",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
            user_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);
    let category_type = row.get(2)?;
    let user_id = UserID::new(row.get(3)?);
    let created_at = timestamp_from_sql(row.get(4)?, 4)?;

    Ok(Category {
        id,
        name,
        category_type,
        user_id,
        created_at,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        CategoryName, Error, TransactionType, User, UserID, create_user, db::initialize,
    };

    use super::{create_category, get_category, list_categories};

    fn get_test_db_connection() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        let user = create_user("Test", "test@email.com", &connection).unwrap();
        (connection, user)
    }

    #[test]
    fn create_category_succeeds() {
        let (connection, user) = get_test_db_connection();
        let name = CategoryName::new("Salário").unwrap();

        let category =
            create_category(name.clone(), TransactionType::Income, user.id, &connection);

        let got_category = category.expect("Could not create category");
        assert!(got_category.id > 0);
        assert_eq!(got_category.name, name);
        assert_eq!(got_category.category_type, TransactionType::Income);
        assert_eq!(got_category.user_id, user.id);
    }

    #[test]
    fn create_category_fails_on_invalid_user() {
        let (connection, user) = get_test_db_connection();

        let result = create_category(
            CategoryName::new_unchecked("Rent"),
            TransactionType::Expense,
            UserID::new(user.id.as_i64() + 1),
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn get_category_succeeds() {
        let (connection, user) = get_test_db_connection();
        let inserted = create_category(
            CategoryName::new_unchecked("Rent"),
            TransactionType::Expense,
            user.id,
            &connection,
        )
        .unwrap();

        let selected = get_category(inserted.id, user.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_hides_other_users_categories() {
        let (connection, user) = get_test_db_connection();
        let other_user = create_user("Other", "other@email.com", &connection).unwrap();
        let inserted = create_category(
            CategoryName::new_unchecked("Rent"),
            TransactionType::Expense,
            user.id,
            &connection,
        )
        .unwrap();

        let selected = get_category(inserted.id, other_user.id, &connection);

        assert_eq!(selected, Err(Error::CategoryNotFound));
    }

    #[test]
    fn list_categories_orders_by_name() {
        let (connection, user) = get_test_db_connection();
        for (name, category_type) in [
            ("Salário", TransactionType::Income),
            ("Aluguel", TransactionType::Expense),
            ("Lazer", TransactionType::Expense),
        ] {
            create_category(
                CategoryName::new_unchecked(name),
                category_type,
                user.id,
                &connection,
            )
            .unwrap();
        }

        let names: Vec<String> = list_categories(user.id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect();

        assert_eq!(names, vec!["Aluguel", "Lazer", "Salário"]);
    }
}

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    example_images, expectations, ideal_partner_photos, matches, photos, profiles,
    refresh_tokens, users,
};

// --- Users ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

// --- Refresh tokens ---

#[derive(Debug, Queryable, Identifiable)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

// --- Profiles ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub audio_clip_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: i32,
    pub description: String,
    pub audio_clip_path: Option<String>,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    pub description: Option<String>,
}

// --- Photos ---

#[derive(Debug, Queryable, Identifiable, Associations, Serialize, Clone)]
#[diesel(table_name = photos)]
#[diesel(belongs_to(Profile))]
pub struct Photo {
    pub id: i32,
    pub profile_id: i32,
    pub file_path: String,
    pub order_index: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto {
    pub profile_id: i32,
    pub file_path: String,
    pub order_index: i32,
}

// --- Expectations ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = expectations)]
pub struct Expectation {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = expectations)]
pub struct NewExpectation {
    pub user_id: i32,
    pub description: String,
}

#[derive(Debug, AsChangeset, Deserialize, Default)]
#[diesel(table_name = expectations)]
pub struct UpdateExpectation {
    pub description: Option<String>,
}

// --- Example images / ideal partner photos ---

#[derive(Debug, Queryable, Identifiable, Associations, Serialize, Clone)]
#[diesel(table_name = example_images)]
#[diesel(belongs_to(Expectation))]
pub struct ExampleImage {
    pub id: i32,
    pub expectation_id: i32,
    pub file_path: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = example_images)]
pub struct NewExampleImage {
    pub expectation_id: i32,
    pub file_path: String,
}

#[derive(Debug, Queryable, Identifiable, Associations, Serialize, Clone)]
#[diesel(table_name = ideal_partner_photos)]
#[diesel(belongs_to(Expectation))]
pub struct IdealPartnerPhoto {
    pub id: i32,
    pub expectation_id: i32,
    pub file_path: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ideal_partner_photos)]
pub struct NewIdealPartnerPhoto {
    pub expectation_id: i32,
    pub file_path: String,
}

// --- Matches ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: i32,
    pub user_id: i32,
    pub matched_user_id: i32,
    pub compatibility_score: f64,
    pub text_score: f64,
    pub visual_score: f64,
    pub personality_score: f64,
    pub lifestyle_score: f64,
    pub emotional_score: f64,
    pub longterm_score: f64,
    pub is_viewed: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user_id: i32,
    pub matched_user_id: i32,
    pub compatibility_score: f64,
    pub text_score: f64,
    pub visual_score: f64,
    pub personality_score: f64,
    pub lifestyle_score: f64,
    pub emotional_score: f64,
    pub longterm_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use amora_shared::clients::db::create_pool;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use diesel_migrations::MigrationHarness;

    type TestConn =
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>;

    fn migrated_conn() -> (tempfile::TempDir, TestConn) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_pool(db_path.to_str().unwrap());
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(crate::MIGRATIONS).unwrap();
        (dir, conn)
    }

    fn insert_user(conn: &mut SqliteConnection, email: &str) -> User {
        diesel::insert_into(crate::schema::users::table)
            .values(&NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
            })
            .get_result(conn)
            .unwrap()
    }

    fn insert_profile(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Profile> {
        diesel::insert_into(crate::schema::profiles::table)
            .values(&NewProfile {
                user_id,
                description: "hello".to_string(),
                audio_clip_path: None,
            })
            .get_result(conn)
    }

    #[test]
    fn a_user_has_at_most_one_profile() {
        let (_dir, mut conn) = migrated_conn();
        let user = insert_user(&mut conn, "one@example.com");

        insert_profile(&mut conn, user.id).unwrap();
        let second = insert_profile(&mut conn, user.id);
        assert!(matches!(
            second,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
        ));
    }

    #[test]
    fn a_user_has_at_most_one_expectation() {
        let (_dir, mut conn) = migrated_conn();
        let user = insert_user(&mut conn, "two@example.com");

        let insert = |conn: &mut SqliteConnection| -> QueryResult<Expectation> {
            diesel::insert_into(crate::schema::expectations::table)
                .values(&NewExpectation {
                    user_id: user.id,
                    description: "kind and curious".to_string(),
                })
                .get_result(conn)
        };

        insert(&mut conn).unwrap();
        assert!(matches!(
            insert(&mut conn),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
        ));
    }

    #[test]
    fn email_is_unique() {
        let (_dir, mut conn) = migrated_conn();
        insert_user(&mut conn, "same@example.com");

        let duplicate: QueryResult<User> = diesel::insert_into(crate::schema::users::table)
            .values(&NewUser {
                email: "same@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: "user".to_string(),
            })
            .get_result(&mut conn);
        assert!(matches!(
            duplicate,
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
        ));
    }

    #[test]
    fn photos_round_trip_with_contiguous_order_indices() {
        let (_dir, mut conn) = migrated_conn();
        let user = insert_user(&mut conn, "photos@example.com");
        let profile = insert_profile(&mut conn, user.id).unwrap();

        let new_photos: Vec<NewPhoto> = (0..4)
            .map(|index| NewPhoto {
                profile_id: profile.id,
                file_path: format!("profiles/photo-{index}.jpg"),
                order_index: index,
            })
            .collect();
        diesel::insert_into(crate::schema::photos::table)
            .values(&new_photos)
            .execute(&mut conn)
            .unwrap();

        let stored: Vec<Photo> = crate::schema::photos::table
            .filter(crate::schema::photos::profile_id.eq(profile.id))
            .order(crate::schema::photos::order_index.asc())
            .load(&mut conn)
            .unwrap();

        assert_eq!(stored.len(), 4);
        let indices: Vec<i32> = stored.iter().map(|p| p.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}

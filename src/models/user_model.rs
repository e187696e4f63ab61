use super::super::schema::*;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid;

#[derive(Debug, Clone, Deserialize, Serialize, Insertable, Queryable)]
#[table_name = "users"]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
}

impl User {
    pub fn from_details<T: Into<String>>(name: T, email: T, password: T) -> User {
        let created_at = super::todo_model::now();

        User {
            email: email.into(),
            password: password.into(),
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            created_at,
            updated_at: created_at,
        }
    }
}

/// Public face of a user: what tokens carry and what responses return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimUser {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
}

impl AsRef<SlimUser> for SlimUser {
    fn as_ref(&self) -> &SlimUser {
        self
    }
}

impl From<User> for SlimUser {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            id: user.id,
        }
    }
}

impl From<&User> for SlimUser {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            id: user.id,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_password_never_serialized() {
        let user = User::from_details("Ann", "ann@example.com", "$argon2i$hash");
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ann@example.com");
    }
}

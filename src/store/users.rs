use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use crate::entity::user;
use crate::error::AppError;
use crate::password::hash_password;

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_login<C: ConnectionTrait>(
    db: &C,
    login: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Login.eq(login))
        .one(db)
        .await
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
}

/// True when `login` belongs to somebody other than `except`.
pub async fn login_taken<C: ConnectionTrait>(
    db: &C,
    login: &str,
    except: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = user::Entity::find().filter(user::Column::Login.eq(login));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

pub async fn email_taken<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, DbErr> {
    let count = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    login: &str,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    let password_hash = hash_password(password)?;
    let active = user::ActiveModel {
        login: Set(login.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(Some(password_hash)),
        last_seen: Set(Some(Utc::now())),
        ..Default::default()
    };
    Ok(active.insert(db).await?)
}

pub async fn set_password<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    password: &str,
) -> Result<(), AppError> {
    let active = user::ActiveModel {
        id: Set(user_id),
        password_hash: Set(Some(hash_password(password)?)),
        ..Default::default()
    };
    user::Entity::update(active).exec(db).await?;
    Ok(())
}

pub async fn update_profile<C: ConnectionTrait>(
    db: &C,
    user: user::Model,
    login: &str,
    about_me: &str,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = user.into();
    active.login = Set(login.to_string());
    active.about_me = Set(Some(about_me.to_string()).filter(|s| !s.is_empty()));
    active.update(db).await
}

pub async fn touch_last_seen<C: ConnectionTrait>(
    db: &C,
    user: user::Model,
) -> Result<user::Model, DbErr> {
    let mut active: user::ActiveModel = user.into();
    active.last_seen = Set(Some(Utc::now()));
    active.update(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::password::check_password;

    #[actix_rt::test]
    async fn create_and_find() {
        let db = connect_memory().await;
        let susan = create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        assert!(susan.last_seen.is_some());
        assert!(check_password(susan.password_hash.as_deref(), "cat"));

        let by_login = find_by_login(&db, "susan").await.unwrap().unwrap();
        let by_email = find_by_email(&db, "susan@example.com").await.unwrap().unwrap();
        assert_eq!(by_login.id, susan.id);
        assert_eq!(by_email.id, susan.id);
        assert!(find_by_login(&db, "nobody").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn duplicate_login_is_rejected_by_the_database() {
        let db = connect_memory().await;
        create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        let dup = create(&db, "susan", "other@example.com", "cat").await;
        assert!(dup.is_err());
    }

    #[actix_rt::test]
    async fn taken_checks() {
        let db = connect_memory().await;
        let susan = create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        assert!(login_taken(&db, "susan", None).await.unwrap());
        assert!(!login_taken(&db, "susan", Some(susan.id)).await.unwrap());
        assert!(!login_taken(&db, "john", None).await.unwrap());
        assert!(email_taken(&db, "susan@example.com").await.unwrap());
        assert!(!email_taken(&db, "john@example.com").await.unwrap());
    }

    #[actix_rt::test]
    async fn set_password_replaces_hash() {
        let db = connect_memory().await;
        let susan = create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        set_password(&db, susan.id, "dog").await.unwrap();
        let reloaded = find_by_id(&db, susan.id).await.unwrap().unwrap();
        assert!(check_password(reloaded.password_hash.as_deref(), "dog"));
        assert!(!check_password(reloaded.password_hash.as_deref(), "cat"));
    }

    #[actix_rt::test]
    async fn update_profile_and_last_seen() {
        let db = connect_memory().await;
        let susan = create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        let before = susan.last_seen;
        let updated = update_profile(&db, susan, "susan2", "hello").await.unwrap();
        assert_eq!(updated.login, "susan2");
        assert_eq!(updated.about_me.as_deref(), Some("hello"));

        let cleared = update_profile(&db, updated, "susan2", "").await.unwrap();
        assert_eq!(cleared.about_me, None);

        let touched = touch_last_seen(&db, cleared).await.unwrap();
        assert!(touched.last_seen >= before);
    }
}

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::entity::followers;

/// Adds the edge unless it already exists. Returns whether a row was written.
/// An existing edge is left alone by the database, so racing follows of the
/// same user both succeed.
pub async fn follow<C: ConnectionTrait>(db: &C, follower_id: i32, followed_id: i32) -> Result<bool, DbErr> {
    let edge = followers::ActiveModel {
        follower_id: Set(follower_id),
        followed_id: Set(followed_id),
    };
    let inserted = followers::Entity::insert(edge)
        .on_conflict(
            OnConflict::columns([followers::Column::FollowerId, followers::Column::FollowedId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

/// Removes the edge if present. Returns whether a row was removed.
pub async fn unfollow<C: ConnectionTrait>(db: &C, follower_id: i32, followed_id: i32) -> Result<bool, DbErr> {
    let result = followers::Entity::delete_many()
        .filter(followers::Column::FollowerId.eq(follower_id))
        .filter(followers::Column::FollowedId.eq(followed_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn is_following<C: ConnectionTrait>(db: &C, follower_id: i32, followed_id: i32) -> Result<bool, DbErr> {
    Ok(followers::Entity::find_by_id((follower_id, followed_id))
        .one(db)
        .await?
        .is_some())
}

pub async fn followers_count<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    followers::Entity::find()
        .filter(followers::Column::FollowedId.eq(user_id))
        .count(db)
        .await
}

pub async fn following_count<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    followers::Entity::find()
        .filter(followers::Column::FollowerId.eq(user_id))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use crate::store::users;

    #[actix_rt::test]
    async fn test_follow() {
        let db = connect_memory().await;
        let u1 = users::create(&db, "anakin", "anakin@example.com", "x").await.unwrap();
        let u2 = users::create(&db, "david", "david@example.com", "x").await.unwrap();
        assert_eq!(following_count(&db, u1.id).await.unwrap(), 0);

        assert!(follow(&db, u1.id, u2.id).await.unwrap());
        assert!(is_following(&db, u1.id, u2.id).await.unwrap());
        assert!(!is_following(&db, u2.id, u1.id).await.unwrap());
        assert_eq!(following_count(&db, u1.id).await.unwrap(), 1);
        assert_eq!(followers_count(&db, u2.id).await.unwrap(), 1);

        assert!(unfollow(&db, u1.id, u2.id).await.unwrap());
        assert!(!is_following(&db, u1.id, u2.id).await.unwrap());
        assert_eq!(following_count(&db, u1.id).await.unwrap(), 0);
        assert_eq!(followers_count(&db, u2.id).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn follow_and_unfollow_are_idempotent() {
        let db = connect_memory().await;
        let u1 = users::create(&db, "anakin", "anakin@example.com", "x").await.unwrap();
        let u2 = users::create(&db, "david", "david@example.com", "x").await.unwrap();

        assert!(follow(&db, u1.id, u2.id).await.unwrap());
        assert!(!follow(&db, u1.id, u2.id).await.unwrap());
        assert_eq!(followers_count(&db, u2.id).await.unwrap(), 1);

        assert!(unfollow(&db, u1.id, u2.id).await.unwrap());
        assert!(!unfollow(&db, u1.id, u2.id).await.unwrap());
        assert_eq!(followers_count(&db, u2.id).await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn racing_follows_write_one_edge() {
        let db = connect_memory().await;
        let u1 = users::create(&db, "anakin", "anakin@example.com", "x").await.unwrap();
        let u2 = users::create(&db, "david", "david@example.com", "x").await.unwrap();

        let (first, second) = futures_util::join!(
            follow(&db, u1.id, u2.id),
            follow(&db, u1.id, u2.id)
        );
        let written = [first.unwrap(), second.unwrap()];
        assert_eq!(written.iter().filter(|w| **w).count(), 1);
        assert_eq!(followers_count(&db, u2.id).await.unwrap(), 1);
    }
}

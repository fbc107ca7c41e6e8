use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, JoinType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::entity::{followers, post, user};

/// One page of results. `page` is 1-based.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    author_id: i32,
    body: &str,
    timestamp: DateTime<Utc>,
) -> Result<post::Model, DbErr> {
    post::ActiveModel {
        body: Set(body.to_string()),
        timestamp: Set(timestamp),
        user_id: Set(author_id),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Posts written by `user_id` or by anyone `user_id` follows, newest first.
///
/// `user` is joined twice: once as the author of each post and once, through
/// the outer join on `followers`, as a follower of that author. Authors with no
/// followers still match on the author side. Grouping by post collapses the
/// fan-out from authors with many followers.
pub fn following_posts(user_id: i32) -> Select<post::Entity> {
    let author = Alias::new("author");
    let follower = Alias::new("follower");

    let mut select = post::Entity::find();
    QuerySelect::query(&mut select)
        .join_as(
            JoinType::InnerJoin,
            user::Entity,
            author.clone(),
            Expr::col((author.clone(), user::Column::Id))
                .equals((post::Entity, post::Column::UserId)),
        )
        .join(
            JoinType::LeftJoin,
            followers::Entity,
            Expr::col((followers::Entity, followers::Column::FollowedId))
                .equals((author.clone(), user::Column::Id)),
        )
        .join_as(
            JoinType::LeftJoin,
            user::Entity,
            follower.clone(),
            Expr::col((follower.clone(), user::Column::Id))
                .equals((followers::Entity, followers::Column::FollowerId)),
        );

    select
        .filter(
            Condition::any()
                .add(Expr::col((follower, user::Column::Id)).eq(user_id))
                .add(Expr::col((author, user::Column::Id)).eq(user_id)),
        )
        .group_by(post::Column::Id)
        .order_by_desc(post::Column::Timestamp)
        .order_by_desc(post::Column::Id)
}

pub fn explore() -> Select<post::Entity> {
    post::Entity::find()
        .order_by_desc(post::Column::Timestamp)
        .order_by_desc(post::Column::Id)
}

pub fn user_posts(user_id: i32) -> Select<post::Entity> {
    post::Entity::find()
        .filter(post::Column::UserId.eq(user_id))
        .order_by_desc(post::Column::Timestamp)
        .order_by_desc(post::Column::Id)
}

/// Pages past the end come back empty rather than failing.
pub async fn paginate<C: ConnectionTrait>(
    db: &C,
    select: Select<post::Entity>,
    page: u64,
    per_page: u64,
) -> Result<Page<post::Model>, DbErr> {
    let page = page.max(1);
    let paginator = select.paginate(db, per_page.max(1));
    let total_pages = paginator.num_pages().await?;
    let items = if page <= total_pages {
        paginator.fetch_page(page - 1).await?
    } else {
        Vec::new()
    };
    Ok(Page {
        items,
        page,
        total_pages,
    })
}

/// Pairs each post with its author, keeping the post order.
pub async fn with_authors<C: ConnectionTrait>(
    db: &C,
    posts: Vec<post::Model>,
) -> Result<Vec<(post::Model, user::Model)>, DbErr> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = posts.iter().map(|p| p.user_id).collect();
    let authors: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(posts
        .into_iter()
        .filter_map(|p| {
            let author = authors.get(&p.user_id)?.clone();
            Some((p, author))
        })
        .collect())
}

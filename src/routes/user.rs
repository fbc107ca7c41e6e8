use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{post_page, PageQuery};
use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{EditProfileForm, FormErrors};
use crate::response::{page, redirect_with_flash};
use crate::store::{follows, posts, users};
use crate::templates::{self, user_path, ProfileView};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/user/{login}").route(web::get().to(profile)))
        .service(
            web::resource("/edit_profile")
                .route(web::get().to(edit_profile_form))
                .route(web::post().to(edit_profile)),
        )
        .service(web::resource("/follow/{login}").route(web::post().to(follow)))
        .service(web::resource("/unfollow/{login}").route(web::post().to(unfollow)));
}

async fn profile(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    current: CurrentUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let login = path.into_inner();
    let user = users::find_by_login(db, &login)
        .await?
        .ok_or_else(AppError::not_found)?;

    let is_self = user.id == current.0.id;
    let is_following = !is_self && follows::is_following(db, current.0.id, user.id).await?;
    let view = ProfileView {
        user: &user,
        is_self,
        is_following,
        followers: follows::followers_count(db, user.id).await?,
        following: follows::following_count(db, user.id).await?,
    };
    let (items, pager) = post_page(
        db,
        posts::user_posts(user.id),
        query.number(),
        config.posts_per_page,
        &user_path(&user.login),
    )
    .await?;

    let content = templates::user_profile(&view, &items, &pager);
    Ok(page(&req, Some(&current.0), &format!("User: {}", user.login), content))
}

fn render_edit_profile(
    req: &HttpRequest,
    current: &CurrentUser,
    form: &EditProfileForm,
    errors: &FormErrors,
) -> HttpResponse {
    page(
        req,
        Some(&current.0),
        "Edit Profile",
        templates::edit_profile(form, errors),
    )
}

async fn edit_profile_form(req: HttpRequest, current: CurrentUser) -> HttpResponse {
    let form = EditProfileForm {
        login: current.0.login.clone(),
        about_me: current.0.about_me.clone().unwrap_or_default(),
    };
    render_edit_profile(&req, &current, &form, &FormErrors::default())
}

async fn edit_profile(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    current: CurrentUser,
    form: web::Form<EditProfileForm>,
) -> Result<HttpResponse, AppError> {
    let txn = db.begin().await?;
    let errors = form.validate(&txn, current.0.id).await?;
    if !errors.is_empty() {
        return Ok(render_edit_profile(&req, &current, &form, &errors));
    }

    let updated = users::update_profile(
        &txn,
        current.0.clone(),
        form.login.trim(),
        form.about_me.trim(),
    )
    .await?;
    txn.commit().await?;
    info!("user {} updated profile", updated.id);
    Ok(redirect_with_flash(&req, "/edit_profile", "Your changes have been saved."))
}

async fn follow(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let login = path.into_inner();
    let txn = db.begin().await?;
    let Some(user) = users::find_by_login(&txn, &login).await? else {
        return Ok(redirect_with_flash(&req, "/index", format!("User {} not found.", login)));
    };
    let target = user_path(&user.login);
    if user.id == current.0.id {
        return Ok(redirect_with_flash(&req, &target, "You cannot follow yourself!"));
    }

    if follows::follow(&txn, current.0.id, user.id).await? {
        info!("{} now follows {}", current.0.login, user.login);
    }
    txn.commit().await?;
    Ok(redirect_with_flash(&req, &target, format!("You are following {}!", user.login)))
}

async fn unfollow(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let login = path.into_inner();
    let txn = db.begin().await?;
    let Some(user) = users::find_by_login(&txn, &login).await? else {
        return Ok(redirect_with_flash(&req, "/index", format!("User {} not found.", login)));
    };
    let target = user_path(&user.login);
    if user.id == current.0.id {
        return Ok(redirect_with_flash(&req, &target, "You cannot unfollow yourself!"));
    }

    if follows::unfollow(&txn, current.0.id, user.id).await? {
        info!("{} unfollowed {}", current.0.login, user.login);
    }
    txn.commit().await?;
    Ok(redirect_with_flash(&req, &target, format!("You are not following {}.", user.login)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test;

    use super::*;
    use crate::db::connect_memory;
    use crate::mail::testing::RecordingSender;
    use crate::routes::testing::{body_text, flashes, location, session_for};

    #[actix_web::test]
    async fn unknown_profile_is_404() {
        let db = connect_memory().await;
        let sender = Arc::new(RecordingSender::default());
        let app = test_app!(db, sender);
        let susan = users::create(&db, "susan", "susan@example.com", "cat").await.unwrap();

        let req = test::TestRequest::get()
            .uri("/user/nobody")
            .cookie(session_for(susan.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("File Not Found"));
    }

    #[actix_web::test]
    async fn own_profile_offers_edit_link() {
        let db = connect_memory().await;
        let sender = Arc::new(RecordingSender::default());
        let app = test_app!(db, sender);
        let susan = users::create(&db, "susan", "susan@example.com", "cat").await.unwrap();

        let req = test::TestRequest::get()
            .uri("/user/susan")
            .cookie(session_for(susan.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("User: susan"));
        assert!(html.contains("/edit_profile"));
        assert!(!html.contains("/follow/susan"));
    }

    #[actix_web::test]
    async fn follow_then_unfollow() {
        let db = connect_memory().await;
        let sender = Arc::new(RecordingSender::default());
        let app = test_app!(db, sender);
        let john = users::create(&db, "john", "john@example.com", "x").await.unwrap();
        let susan = users::create(&db, "susan", "susan@example.com", "x").await.unwrap();

        let req = test::TestRequest::post()
            .uri("/follow/susan")
            .cookie(session_for(john.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/user/susan");
        assert_eq!(flashes(&resp), vec!["You are following susan!"]);
        assert!(follows::is_following(&db, john.id, susan.id).await.unwrap());
        assert_eq!(follows::followers_count(&db, susan.id).await.unwrap(), 1);

        let req = test::TestRequest::get()
            .uri("/user/susan")
            .cookie(session_for(john.id))
            .to_request();
        let html = body_text(test::call_service(&app, req).await).await;
        assert!(html.contains("1 followers, 0 following."));
        assert!(html.contains("/unfollow/susan"));

        let req = test::TestRequest::post()
            .uri("/unfollow/susan")
            .cookie(session_for(john.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(flashes(&resp), vec!["You are not following susan."]);
        assert!(!follows::is_following(&db, john.id, susan.id).await.unwrap());
    }

    #[actix_web::test]
    async fn cannot_follow_self_or_strangers() {
        let db = connect_memory().await;
        let sender = Arc::new(RecordingSender::default());
        let app = test_app!(db, sender);
        let john = users::create(&db, "john", "john@example.com", "x").await.unwrap();

        let req = test::TestRequest::post()
            .uri("/follow/john")
            .cookie(session_for(john.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/user/john");
        assert_eq!(flashes(&resp), vec!["You cannot follow yourself!"]);
        assert_eq!(follows::following_count(&db, john.id).await.unwrap(), 0);

        let req = test::TestRequest::post()
            .uri("/unfollow/john")
            .cookie(session_for(john.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(flashes(&resp), vec!["You cannot unfollow yourself!"]);

        let req = test::TestRequest::post()
            .uri("/follow/ghost")
            .cookie(session_for(john.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/index");
        assert_eq!(flashes(&resp), vec!["User ghost not found."]);
    }

    #[actix_web::test]
    async fn edit_profile_saves_and_rejects_taken_login() {
        let db = connect_memory().await;
        let sender = Arc::new(RecordingSender::default());
        let app = test_app!(db, sender);
        let susan = users::create(&db, "susan", "susan@example.com", "x").await.unwrap();
        users::create(&db, "john", "john@example.com", "x").await.unwrap();

        let req = test::TestRequest::get()
            .uri("/edit_profile")
            .cookie(session_for(susan.id))
            .to_request();
        let html = body_text(test::call_service(&app, req).await).await;
        assert!(html.contains("value=\"susan\""));

        let req = test::TestRequest::post()
            .uri("/edit_profile")
            .cookie(session_for(susan.id))
            .set_form([("login", "john"), ("about_me", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Please use a different login."));

        let req = test::TestRequest::post()
            .uri("/edit_profile")
            .cookie(session_for(susan.id))
            .set_form([("login", "susie"), ("about_me", "I like cats")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/edit_profile");
        assert_eq!(flashes(&resp), vec!["Your changes have been saved."]);

        let saved = users::find_by_id(&db, susan.id).await.unwrap().unwrap();
        assert_eq!(saved.login, "susie");
        assert_eq!(saved.about_me.as_deref(), Some("I like cats"));
    }
}

//! Form payloads and their validation rules.
//!
//! Validation never fails the request: it collects per-field messages that the
//! handler renders next to the inputs.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ConnectionTrait, DbErr};
use serde::Deserialize;

use crate::store::users;

pub const LOGIN_MAX: usize = 64;
pub const EMAIL_MAX: usize = 120;
pub const POST_MAX: usize = 140;
pub const ABOUT_ME_MAX: usize = 140;

const REQUIRED: &str = "This field is required.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

#[derive(Debug, Default)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.entry(field).or_default().push(msg.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn required(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, REQUIRED);
            return false;
        }
        true
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("Field cannot be longer than {} characters.", max));
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if !EMAIL_RE.is_match(value.trim()) {
            self.add(field, "Invalid email address.");
        }
    }

    fn equal_to(&mut self, field: &'static str, value: &str, other: &str, other_name: &str) {
        if value != other {
            self.add(field, format!("Field must be equal to {}.", other_name));
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
    pub remember_me: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.required("login", &self.login);
        errors.required("password", &self.password);
        errors
    }

    pub fn remember(&self) -> bool {
        matches!(self.remember_me.as_deref(), Some(v) if !v.is_empty() && v != "false")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub login: String,
    pub email: String,
    pub password: String,
    pub repeat_password: String,
}

impl RegistrationForm {
    pub async fn validate<C: ConnectionTrait>(&self, db: &C) -> Result<FormErrors, DbErr> {
        let mut errors = FormErrors::default();
        let login = self.login.trim();
        let email = self.email.trim();

        if errors.required("login", login) {
            errors.max_len("login", login, LOGIN_MAX);
            if users::login_taken(db, login, None).await? {
                errors.add("login", "Please use a different login.");
            }
        }
        if errors.required("email", email) {
            errors.max_len("email", email, EMAIL_MAX);
            errors.email("email", email);
            if users::email_taken(db, email).await? {
                errors.add("email", "Please use a different email address.");
            }
        }
        errors.required("password", &self.password);
        if errors.required("repeat_password", &self.repeat_password) {
            errors.equal_to("repeat_password", &self.repeat_password, &self.password, "password");
        }
        Ok(errors)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditProfileForm {
    pub login: String,
    pub about_me: String,
}

impl EditProfileForm {
    /// `user_id` may keep its current login.
    pub async fn validate<C: ConnectionTrait>(&self, db: &C, user_id: i32) -> Result<FormErrors, DbErr> {
        let mut errors = FormErrors::default();
        let login = self.login.trim();
        if errors.required("login", login) {
            errors.max_len("login", login, LOGIN_MAX);
            if users::login_taken(db, login, Some(user_id)).await? {
                errors.add("login", "Please use a different login.");
            }
        }
        errors.max_len("about_me", self.about_me.trim(), ABOUT_ME_MAX);
        Ok(errors)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub post: String,
}

impl PostForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if errors.required("post", &self.post) {
            errors.max_len("post", self.post.trim(), POST_MAX);
        }
        errors
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequestForm {
    pub email: String,
}

impl ResetPasswordRequestForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if errors.required("email", &self.email) {
            errors.email("email", &self.email);
        }
        errors
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    pub password: String,
    pub repeat_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.required("password", &self.password);
        if errors.required("repeat_password", &self.repeat_password) {
            errors.equal_to("repeat_password", &self.repeat_password, &self.password, "password");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;

    #[test]
    fn login_form_requires_both_fields() {
        let errors = LoginForm::default().validate();
        assert_eq!(errors.get("login"), [REQUIRED]);
        assert_eq!(errors.get("password"), [REQUIRED]);

        let ok = LoginForm {
            login: "susan".into(),
            password: "cat".into(),
            remember_me: Some("y".into()),
        };
        assert!(ok.validate().is_empty());
        assert!(ok.remember());
        assert!(!LoginForm::default().remember());
    }

    #[test]
    fn post_form_bounds_length() {
        assert!(!PostForm { post: "   ".into() }.validate().is_empty());
        assert!(PostForm { post: "x".repeat(POST_MAX) }.validate().is_empty());
        let too_long = PostForm { post: "x".repeat(POST_MAX + 1) }.validate();
        assert_eq!(too_long.get("post").len(), 1);
    }

    #[test]
    fn reset_forms() {
        let bad = ResetPasswordRequestForm { email: "nope".into() }.validate();
        assert_eq!(bad.get("email"), ["Invalid email address."]);
        assert!(ResetPasswordRequestForm { email: "a@b.io".into() }.validate().is_empty());

        let mismatch = ResetPasswordForm {
            password: "a".into(),
            repeat_password: "b".into(),
        }
        .validate();
        assert_eq!(mismatch.get("repeat_password"), ["Field must be equal to password."]);
    }

    #[actix_rt::test]
    async fn registration_rejects_taken_login_and_email() {
        let db = connect_memory().await;
        users::create(&db, "susan", "susan@example.com", "cat").await.unwrap();

        let form = RegistrationForm {
            login: "susan".into(),
            email: "susan@example.com".into(),
            password: "dog".into(),
            repeat_password: "dog".into(),
        };
        let errors = form.validate(&db).await.unwrap();
        assert_eq!(errors.get("login"), ["Please use a different login."]);
        assert_eq!(errors.get("email"), ["Please use a different email address."]);

        let fresh = RegistrationForm {
            login: "john".into(),
            email: "john@example.com".into(),
            password: "dog".into(),
            repeat_password: "dog".into(),
        };
        assert!(fresh.validate(&db).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn edit_profile_allows_own_login() {
        let db = connect_memory().await;
        let susan = users::create(&db, "susan", "susan@example.com", "cat").await.unwrap();
        users::create(&db, "john", "john@example.com", "cat").await.unwrap();

        let keep = EditProfileForm { login: "susan".into(), about_me: "hi".into() };
        assert!(keep.validate(&db, susan.id).await.unwrap().is_empty());

        let steal = EditProfileForm { login: "john".into(), about_me: String::new() };
        let errors = steal.validate(&db, susan.id).await.unwrap();
        assert_eq!(errors.get("login"), ["Please use a different login."]);

        let long_bio = EditProfileForm { login: "susan".into(), about_me: "x".repeat(141) };
        assert_eq!(long_bio.validate(&db, susan.id).await.unwrap().get("about_me").len(), 1);
    }
}

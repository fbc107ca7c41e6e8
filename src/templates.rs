//! Server-rendered pages.
//!
//! The layout and email bodies are embedded files with upper-case
//! placeholders; page bodies are assembled here. All user-supplied text goes
//! through `html_escape` before it is spliced in.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::avatar::avatar_url;
use crate::entity::{post, user};
use crate::forms::{
    EditProfileForm, FormErrors, LoginForm, PostForm, RegistrationForm, ResetPasswordRequestForm,
};

const BASE: &str = include_str!("../templates/base.html");
const RESET_EMAIL_TXT: &str = include_str!("../templates/reset_password_email.txt");
const RESET_EMAIL_HTML: &str = include_str!("../templates/reset_password_email.html");

/// Previous/next links under a post list.
#[derive(Debug, Default)]
pub struct Pager {
    pub prev: Option<String>,
    pub next: Option<String>,
}

pub struct ProfileView<'a> {
    pub user: &'a user::Model,
    pub is_self: bool,
    pub is_following: bool,
    pub followers: u64,
    pub following: u64,
}

/// Path of a user's profile page.
pub fn user_path(login: &str) -> String {
    format!("/user/{}", urlencoding::encode(login))
}

/// Substitutes placeholders in a single left-to-right pass so inserted values
/// are never rescanned.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let next = vars
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|pos| (pos, *key, *value)))
            .min_by_key(|(pos, _, _)| *pos);
        match next {
            Some((pos, key, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

pub fn layout(
    title: &str,
    current: Option<&user::Model>,
    flashes: &[String],
    content: &str,
) -> String {
    let title = if title.is_empty() {
        "Welcome to Microblog".to_string()
    } else {
        format!("{} - Microblog", text(title))
    };

    let mut nav = String::from(
        r#"<a href="/index"><strong>Microblog</strong></a><a href="/index">Home</a><a href="/explore">Explore</a><span class="right">"#,
    );
    match current {
        Some(u) => nav.push_str(&format!(
            r#"<a href="{}">Profile</a><a href="/logout">Logout</a>"#,
            attr(&user_path(&u.login))
        )),
        None => nav.push_str(r#"<a href="/login">Login</a>"#),
    }
    nav.push_str("</span>");

    let flashes: String = flashes
        .iter()
        .map(|m| format!("<div class=\"flash\">{}</div>\n", text(m)))
        .collect();

    fill(
        BASE,
        &[
            ("PAGE_TITLE", title.as_str()),
            ("PAGE_NAV", nav.as_str()),
            ("PAGE_FLASHES", flashes.as_str()),
            ("PAGE_CONTENT", content),
        ],
    )
}

pub fn not_found_page() -> String {
    layout(
        "Not Found",
        None,
        &[],
        r#"<h1>File Not Found</h1><p><a href="/index">Back</a></p>"#,
    )
}

pub fn internal_error_page() -> String {
    layout(
        "Error",
        None,
        &[],
        r#"<h1>An unexpected error has occurred</h1><p>The administrator has been notified. Sorry for the inconvenience!</p><p><a href="/index">Back</a></p>"#,
    )
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn field_errors(errors: &FormErrors, field: &str) -> String {
    errors
        .get(field)
        .iter()
        .map(|e| format!("<br><span class=\"error\">[{}]</span>", text(e)))
        .collect()
}

fn input(label: &str, name: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<p><label for=\"{name}\">{label}</label><br><input id=\"{name}\" name=\"{name}\" type=\"{kind}\" value=\"{value}\">{errs}</p>",
        name = name,
        label = label,
        kind = kind,
        value = attr(value),
        errs = field_errors(errors, name),
    )
}

fn textarea(label: &str, name: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        "<p><label for=\"{name}\">{label}</label><br><textarea id=\"{name}\" name=\"{name}\" cols=\"50\" rows=\"4\">{value}</textarea>{errs}</p>",
        name = name,
        label = label,
        value = text(value),
        errs = field_errors(errors, name),
    )
}

fn post_entry(post: &post::Model, author: &user::Model) -> String {
    format!(
        "<div class=\"post\"><img src=\"{avatar}\" alt=\"\" width=\"36\" height=\"36\"><div><a href=\"{profile}\">{login}</a> said {when}:<br>{body}</div></div>\n",
        avatar = attr(&avatar_url(&author.email, 36)),
        profile = attr(&user_path(&author.login)),
        login = text(&author.login),
        when = format_time(&post.timestamp),
        body = text(&post.body),
    )
}

fn post_list(posts: &[(post::Model, user::Model)], pager: &Pager) -> String {
    let mut html: String = posts.iter().map(|(p, a)| post_entry(p, a)).collect();
    html.push_str("<div class=\"pager\">");
    match &pager.prev {
        Some(url) => html.push_str(&format!("<a href=\"{}\">&larr; Newer posts</a>", attr(url))),
        None => html.push_str("<span></span>"),
    }
    if let Some(url) = &pager.next {
        html.push_str(&format!("<a href=\"{}\">Older posts &rarr;</a>", attr(url)));
    }
    html.push_str("</div>");
    html
}

/// Home page (with the post form) and the explore page (without).
pub fn index(
    current: &user::Model,
    form: Option<(&PostForm, &FormErrors)>,
    posts: &[(post::Model, user::Model)],
    pager: &Pager,
) -> String {
    let mut html = format!("<h1>Hi, {}!</h1>", text(&current.login));
    if let Some((form, errors)) = form {
        html.push_str("<form action=\"/index\" method=\"post\">");
        html.push_str(&textarea("Say something", "post", &form.post, errors));
        html.push_str("<p><input type=\"submit\" value=\"Submit\"></p></form>");
    }
    html.push_str(&post_list(posts, pager));
    html
}

pub fn login(form: &LoginForm, errors: &FormErrors, next: Option<&str>) -> String {
    let action = match next {
        Some(n) => format!("/login?next={}", urlencoding::encode(n)),
        None => "/login".to_string(),
    };
    let mut html = format!("<h1>Sign In</h1><form action=\"{}\" method=\"post\">", attr(&action));
    html.push_str(&input("Login", "login", "text", &form.login, errors));
    html.push_str(&input("Password", "password", "password", "", errors));
    html.push_str(&format!(
        "<p><input id=\"remember_me\" name=\"remember_me\" type=\"checkbox\" value=\"y\"{}> <label for=\"remember_me\">Remember Me</label></p>",
        if form.remember() { " checked" } else { "" }
    ));
    html.push_str("<p><input type=\"submit\" value=\"Sign In\"></p></form>");
    html.push_str("<p>New User? <a href=\"/register\">Click to Register!</a></p>");
    html.push_str("<p>Forgot Your Password? <a href=\"/reset_password_request\">Click to Reset It</a></p>");
    html
}

pub fn register(form: &RegistrationForm, errors: &FormErrors) -> String {
    let mut html = String::from("<h1>Register</h1><form action=\"/register\" method=\"post\">");
    html.push_str(&input("Login", "login", "text", &form.login, errors));
    html.push_str(&input("Email", "email", "email", &form.email, errors));
    html.push_str(&input("Password", "password", "password", "", errors));
    html.push_str(&input("Repeat Password", "repeat_password", "password", "", errors));
    html.push_str("<p><input type=\"submit\" value=\"Register\"></p></form>");
    html
}

pub fn user_profile(profile: &ProfileView<'_>, posts: &[(post::Model, user::Model)], pager: &Pager) -> String {
    let u = profile.user;
    let mut html = format!(
        "<table><tr><td><img src=\"{}\" alt=\"\" width=\"128\" height=\"128\"></td><td><h1>User: {}</h1>",
        attr(&avatar_url(&u.email, 128)),
        text(&u.login)
    );
    if let Some(about) = u.about_me.as_deref().filter(|s| !s.is_empty()) {
        html.push_str(&format!("<p>{}</p>", text(about)));
    }
    if let Some(seen) = &u.last_seen {
        html.push_str(&format!("<p>Last seen on: {}</p>", format_time(seen)));
    }
    html.push_str(&format!(
        "<p>{} followers, {} following.</p>",
        profile.followers, profile.following
    ));
    let login = urlencoding::encode(&u.login);
    if profile.is_self {
        html.push_str("<p><a href=\"/edit_profile\">Edit your profile</a></p>");
    } else if profile.is_following {
        html.push_str(&format!(
            "<form action=\"/unfollow/{}\" method=\"post\"><input type=\"submit\" value=\"Unfollow\"></form>",
            login
        ));
    } else {
        html.push_str(&format!(
            "<form action=\"/follow/{}\" method=\"post\"><input type=\"submit\" value=\"Follow\"></form>",
            login
        ));
    }
    html.push_str("</td></tr></table><hr>");
    html.push_str(&post_list(posts, pager));
    html
}

pub fn edit_profile(form: &EditProfileForm, errors: &FormErrors) -> String {
    let mut html = String::from("<h1>Edit Profile</h1><form action=\"/edit_profile\" method=\"post\">");
    html.push_str(&input("Login", "login", "text", &form.login, errors));
    html.push_str(&textarea("About me", "about_me", &form.about_me, errors));
    html.push_str("<p><input type=\"submit\" value=\"Submit\"></p></form>");
    html
}

pub fn reset_password_request(form: &ResetPasswordRequestForm, errors: &FormErrors) -> String {
    let mut html = String::from(
        "<h1>Reset Password</h1><form action=\"/reset_password_request\" method=\"post\">",
    );
    html.push_str(&input("Email", "email", "email", &form.email, errors));
    html.push_str("<p><input type=\"submit\" value=\"Request Password Reset\"></p></form>");
    html
}

pub fn reset_password(token: &str, errors: &FormErrors) -> String {
    let mut html = format!(
        "<h1>Reset Your Password</h1><form action=\"/reset_password/{}\" method=\"post\">",
        attr(token)
    );
    html.push_str(&input("Password", "password", "password", "", errors));
    html.push_str(&input("Repeat Password", "repeat_password", "password", "", errors));
    html.push_str("<p><input type=\"submit\" value=\"Request Password Reset\"></p></form>");
    html
}

/// Plain-text and HTML bodies of the password reset mail.
pub fn reset_password_email(login: &str, reset_url: &str) -> (String, String) {
    let body_text = fill(RESET_EMAIL_TXT, &[("USER_LOGIN", login), ("RESET_URL", reset_url)]);
    let login_html = text(login);
    let url_html = attr(reset_url);
    let body_html = fill(
        RESET_EMAIL_HTML,
        &[("USER_LOGIN", login_html.as_ref()), ("RESET_URL", url_html.as_ref())],
    );
    (body_text, body_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn susan() -> user::Model {
        user::Model {
            id: 1,
            login: "susan".into(),
            email: "susan@example.com".into(),
            password_hash: None,
            about_me: Some("<b>bold</b>".into()),
            last_seen: None,
        }
    }

    #[test]
    fn fill_does_not_rescan_inserted_values() {
        let out = fill("A B", &[("A", "B"), ("B", "x")]);
        assert_eq!(out, "B x");
    }

    #[test]
    fn layout_escapes_flashes_and_shows_nav() {
        let html = layout("Home", None, &["<script>".to_string()], "<p>body</p>");
        assert!(html.contains("<title>Home - Microblog</title>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("href=\"/login\""));
        assert!(html.contains("<p>body</p>"));

        let u = susan();
        let html = layout("", Some(&u), &[], "");
        assert!(html.contains("Welcome to Microblog"));
        assert!(html.contains("/user/susan"));
        assert!(html.contains("/logout"));
    }

    #[test]
    fn profile_escapes_about_me_and_picks_button() {
        let u = susan();
        let view = ProfileView {
            user: &u,
            is_self: false,
            is_following: true,
            followers: 2,
            following: 0,
        };
        let html = user_profile(&view, &[], &Pager::default());
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("/unfollow/susan"));
        assert!(html.contains("2 followers, 0 following."));
    }

    #[test]
    fn user_path_encodes_the_login() {
        assert_eq!(user_path("susan"), "/user/susan");
        assert_eq!(user_path("a b/c"), "/user/a%20b%2Fc");
    }

    #[test]
    fn reset_email_contains_link() {
        let (txt, html) = reset_password_email("susan", "http://localhost/reset_password/abc");
        assert!(txt.contains("Dear susan,"));
        assert!(txt.contains("http://localhost/reset_password/abc"));
        assert!(html.contains("href=\"http://localhost/reset_password/abc\""));
    }
}

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Form, Query},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::{User, clear_login_cookie, set_login_cookie},
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, SuccessResponse},
    widgets::alert::ErrorAlert,
};

#[derive(Deserialize, Debug, Default)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// Where to go after logging in. Only the path (and query) of `next` is
    /// kept, so that a crafted link cannot send the user off-site.
    pub fn target(&self) -> String {
        let Some(next) = self.next.as_deref() else {
            return "/".to_string();
        };

        let Ok(base) = Url::parse("http://localhost/") else {
            return "/".to_string();
        };
        match base.join(next) {
            Ok(url) => match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            },
            Err(_) => "/".to_string(),
        }
    }

    fn form_action(&self) -> String {
        match &self.next {
            Some(next) => format!(
                "/login?{}",
                serde_urlencoded::to_string([("next", next)])
                    .unwrap_or_default()
            ),
            None => "/login".to_string(),
        }
    }
}

struct LoginFormView<'r> {
    action: &'r str,
    id: &'r str,
    error: Option<&'r str>,
}

impl<'r> Renderable for LoginFormView<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            h1 { "Log in" }
            @if let Some(error) = self.error {
                ErrorAlert msg=(error);
            }
            form method="post" action=(self.action) class="mt-4" style="max-width: 28rem;" {
                div class="mb-3" {
                    label for="id" class="form-label" { "Username or email" }
                    input type="text" class="form-control" id="id" name="id" value=(self.id);
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "Password" }
                    input type="password" class="form-control" id="password" name="password";
                }
                button type="submit" class="btn btn-primary" { "Log in" }
            }
            p class="mt-3" {
                "No account yet? " a href="/register" { "Register" }
            }
        }
        .render_to(buffer);
    }
}

pub async fn login_page(
    user: Option<User<true>>,
    Query(next): Query<NextQuery>,
) -> Result<SuccessResponse, FailureResponse> {
    if user.is_some() {
        return Ok(SuccessResponse::SeeOther(Box::new(Redirect::to(
            &next.target(),
        ))));
    }

    Ok(SuccessResponse::Success(
        Page::new()
            .title("Log in")
            .user_opt(user)
            .body(maud! {
                LoginFormView action=(&next.form_action()) id=("") error=(None);
            })
            .render(),
    ))
}

#[derive(Deserialize)]
pub struct LoginForm {
    id: String,
    password: String,
}

#[tracing::instrument(skip(conn, jar, form))]
pub async fn do_login(
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Query(next): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, SuccessResponse), FailureResponse> {
    let user = users::table
        .filter(users::email.eq(&form.id).or(users::username.eq(&form.id)))
        .first::<User<true>>(&mut *conn)
        .optional()?;

    let verified = user.filter(|user| {
        PasswordHash::new(&user.password_hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(form.password.as_bytes(), &parsed)
                .is_ok()
        })
    });

    let Some(user) = verified else {
        tracing::info!("failed login attempt");
        return Err(FailureResponse::BadRequest(
            Page::<_, String, true>::new()
                .title("Log in")
                .body(maud! {
                    LoginFormView
                        action=(&next.form_action())
                        id=(&form.id)
                        error=(Some("Incorrect username, email or password."));
                })
                .render(),
        ));
    };

    tracing::info!("user {} logged in", user.id);
    let jar = set_login_cookie(user.id, jar);

    Ok((
        jar,
        SuccessResponse::SeeOther(Box::new(Redirect::to(&next.target()))),
    ))
}

pub async fn do_logout(
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, SuccessResponse) {
    (
        clear_login_cookie(jar),
        SuccessResponse::SeeOther(Box::new(Redirect::to("/"))),
    )
}

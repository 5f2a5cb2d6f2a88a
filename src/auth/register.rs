use argon2::Argon2;
use argon2::PasswordHasher;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::{extract::Form, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use chrono::Utc;
use diesel::{insert_into, prelude::*};
use hypertext::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::validation::*;
use crate::{
    auth::{Role, User, set_login_cookie},
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, SuccessResponse},
};

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub phone: String,
    pub address: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("username", is_ascii_no_spaces(&self.username));
        errors.check("username", max_len(150)(&self.username));
        errors.check("email", is_valid_email(&self.email));
        if !User::<true>::validate_password(&self.password) {
            errors.push("password", "must be at least 6 characters long");
        }
        if self.password != self.password2 {
            errors.push("password2", "passwords do not match");
        }
        errors.check("phone", is_valid_phone(self.phone.trim()));
        errors.check("address", max_len(500)(&self.address));
        errors
    }
}

struct RegisterFormView<'r> {
    form: &'r RegisterForm,
    errors: &'r FieldErrors,
}

impl<'r> Renderable for RegisterFormView<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let fields = [
            ("username", "Username", "text", self.form.username.as_str()),
            ("email", "Email", "email", self.form.email.as_str()),
            ("password", "Password", "password", ""),
            ("password2", "Confirm Password", "password", ""),
            ("phone", "Phone (optional)", "tel", self.form.phone.as_str()),
        ];

        maud! {
            h1 { "Register" }
            form method="post" action="/register" class="mt-4" style="max-width: 32rem;" {
                @for (name, label, kind, value) in fields {
                    div class="mb-3" {
                        label for=(name) class="form-label" { (label) }
                        @if let Some(e) = self.errors.get(name) {
                            input type=(kind) class="form-control is-invalid" id=(name) name=(name) value=(value);
                            div class="invalid-feedback" { (e) }
                        } @else {
                            input type=(kind) class="form-control" id=(name) name=(name) value=(value);
                        }
                    }
                }
                div class="mb-3" {
                    label for="address" class="form-label" { "Address (optional)" }
                    textarea class="form-control" id="address" name="address" rows="2" {
                        (self.form.address)
                    }
                }
                button type="submit" class="btn btn-primary" { "Register" }
            }
        }
        .render_to(buffer);
    }
}

pub async fn register_page(
    user: Option<User<true>>,
) -> Result<SuccessResponse, FailureResponse> {
    if user.is_some() {
        return Ok(SuccessResponse::SeeOther(Box::new(Redirect::to("/"))));
    }

    let form = RegisterForm::default();
    let errors = FieldErrors::new();
    Ok(SuccessResponse::Success(
        Page::new()
            .title("Register")
            .user_opt(user)
            .body(maud! {
                RegisterFormView form=(&form) errors=(&errors);
            })
            .render(),
    ))
}

fn try_again(form: &RegisterForm, errors: &FieldErrors) -> FailureResponse {
    FailureResponse::BadRequest(
        Page::<_, String, true>::new()
            .title("Register")
            .body(maud! {
                RegisterFormView form=(form) errors=(errors);
            })
            .render(),
    )
}

/// Creates a customer account and logs it in.
#[tracing::instrument(skip_all)]
pub async fn do_register(
    user: Option<User<true>>,
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(PrivateCookieJar, SuccessResponse), FailureResponse> {
    if user.is_some() {
        return Ok((
            jar,
            SuccessResponse::SeeOther(Box::new(Redirect::to("/"))),
        ));
    }

    let mut errors = form.validate();
    if !errors.is_empty() {
        return Err(try_again(&form, &errors));
    }

    let existing = users::table
        .filter(
            users::username
                .eq(&form.username)
                .or(users::email.eq(&form.email)),
        )
        .select((users::username, users::email))
        .first::<(String, String)>(&mut *conn)
        .optional()?;

    if let Some((username, email)) = existing {
        if email == form.email {
            errors.push("email", "that email is already taken");
        }
        if username == form.username {
            errors.push("username", "that username is already taken");
        }
        return Err(try_again(&form, &errors));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("could not hash password: {e}");
            FailureResponse::ServerError(())
        })?
        .to_string();

    let id = Uuid::now_v7().to_string();
    insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::username.eq(&form.username),
            users::email.eq(&form.email),
            users::password_hash.eq(password_hash),
            users::role.eq(Role::Customer),
            users::phone.eq(form.phone.trim()),
            users::address.eq(form.address.trim()),
            users::is_superuser.eq(false),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;
    tracing::info!("registered user {id}");

    Ok((
        set_login_cookie(id, jar),
        SuccessResponse::SeeOther(Box::new(Redirect::to("/"))),
    ))
}

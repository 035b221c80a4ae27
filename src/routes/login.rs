//! Password login.
//!
//! # Responsibilities
//! - Send already authenticated callers on to their target
//! - Render the login form with where the password came from
//! - Check submitted passwords behind the login rate limiter
//! - Issue the session cookie on success

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use constant_time_eq::constant_time_eq;
use serde::Deserialize;
use serde_json::Map;

use crate::config::PasswordSource;
use crate::http::error::GatewayError;
use crate::http::redirect::{overrides, redirect};
use crate::http::request::{Cookies, FormOrJson, RequestContext};
use crate::http::server::AppState;
use crate::observability::metrics::record_login;
use crate::security::auth::{hash, is_authenticated};
use crate::security::cookie::{cookie_domain, session_cookie};
use crate::template::escape_html;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: Option<String>,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(submit))
        .route("/login/", get(login_page).post(submit))
        .route_layer(middleware::from_fn_with_state(state, skip_if_authenticated))
}

async fn skip_if_authenticated(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: RequestContext,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if is_authenticated(&state.config.auth, &cookies) {
        return redirect_to_target(&ctx);
    }
    Ok(next.run(request).await)
}

fn redirect_to_target(ctx: &RequestContext) -> Result<Response, GatewayError> {
    let to = ctx.query_str("to").unwrap_or("/");
    redirect(ctx, to, &overrides([("to", None)]))
}

async fn login_page(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Html<String>, GatewayError> {
    render(&state, &ctx, None).await
}

async fn submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    FormOrJson(form): FormOrJson<LoginForm>,
) -> Result<Response, GatewayError> {
    match check_password(&state, form.password.as_deref()) {
        Ok(password) => {
            record_login("success");
            let domain = ctx
                .host
                .as_deref()
                .and_then(|host| cookie_domain(host, &state.config.auth.proxy_domains));
            let cookie = session_cookie(&hash(password), domain.as_deref());
            let cookie = HeaderValue::from_str(&cookie)
                .map_err(|_| GatewayError::BadRequest("Invalid cookie".into()))?;

            let mut response = redirect_to_target(&ctx)?;
            response.headers_mut().insert(header::SET_COOKIE, cookie);
            Ok(response)
        }
        Err(failure) => {
            record_login(failure.outcome);
            render(&state, &ctx, Some(failure.message))
                .await
                .map(IntoResponse::into_response)
        }
    }
}

struct LoginFailure {
    outcome: &'static str,
    message: &'static str,
}

fn check_password<'a>(state: &AppState, submitted: Option<&'a str>) -> Result<&'a str, LoginFailure> {
    if !state.login_limiter.try_acquire() {
        tracing::warn!("Login rate limited");
        return Err(LoginFailure {
            outcome: "rate_limited",
            message: "Login rate limited!",
        });
    }

    let Some(submitted) = submitted.filter(|p| !p.is_empty()) else {
        return Err(LoginFailure {
            outcome: "missing",
            message: "Missing password",
        });
    };

    let matches = state
        .config
        .auth
        .password
        .as_deref()
        .is_some_and(|expected| constant_time_eq(submitted.as_bytes(), expected.as_bytes()));
    if matches {
        return Ok(submitted);
    }

    tracing::warn!("Failed login attempt");
    Err(LoginFailure {
        outcome: "incorrect",
        message: "Incorrect password",
    })
}

async fn render(
    state: &AppState,
    ctx: &RequestContext,
    error: Option<&str>,
) -> Result<Html<String>, GatewayError> {
    let content = state.templates.load("login.html").await?;
    let error = error
        .map(|message| format!("<div class=\"error\">{}</div>", escape_html(message)))
        .unwrap_or_default();

    let html = state
        .templates
        .render(ctx, &content, Map::new())
        .replace("{{PASSWORD_MSG}}", &escape_html(&password_message(state)))
        .replace("{{ERROR}}", &error);
    Ok(Html(html))
}

fn password_message(state: &AppState) -> String {
    match state.config.auth.password_source {
        PasswordSource::Environment => "Password was set from $PASSWORD.".to_string(),
        PasswordSource::Generated => format!(
            "Check {} for the generated password.",
            state.config.generated_password_path().display()
        ),
        PasswordSource::ConfigFile => match &state.config.source {
            Some(path) => format!("Check the config file at {} for the password.", path.display()),
            None => "Check the config file for the password.".to_string(),
        },
    }
}

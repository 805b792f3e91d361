use axum::body::Body;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use validator::Validate;

use crate::config::UniqueKey;
use crate::errors::AppError;
use crate::schemas::AppState;
use crate::session::{SessionCookie, SessionData};
use crate::validation;
use crate::views;
use model::entities::{role, user};

/// The registration form. Which fields are actually rendered and honored is
/// decided by the configured registration profile; extra fields submitted
/// against a narrower profile are ignored.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 1, message = "Please tell us your name."))]
    pub name: String,
    pub role: Option<String>,
    pub prontuario: Option<String>,
    pub copy_to: Option<String>,
}

/// Display state: the form, the one-time greeting, and the user list.
#[instrument]
pub async fn index_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    trace!("Entering index_page");
    let session = load_session(&state, &headers).await;
    render_display_state(&state, &session, &[], None).await
}

/// Process state: validate, persist, notify, update the session, redirect.
#[instrument]
pub async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    trace!("Entering register_submit");
    let profile = state.config.profile;
    let mut session = load_session(&state, &headers).await;

    // Field validation failures re-render the form inline with no mutation.
    let errors = validation::validate_submission(profile, &form);
    if !errors.is_empty() {
        let page = render_display_state(&state, &session, &errors, Some(&form)).await?;
        return Ok(page.into_response());
    }

    let name = form.name.trim().to_string();

    let existing = match profile.unique_key() {
        UniqueKey::Prontuario => {
            // Validation guarantees a well-formed identifier at this point
            let value = form.prontuario.as_deref().unwrap_or_default().trim();
            validation::find_by_prontuario(&state.db, value).await?
        }
        UniqueKey::Username => validation::find_by_username(&state.db, &name).await?,
    };

    match existing {
        Some(existing_user) => {
            info!(
                "Duplicate registration for '{}', no record created",
                existing_user.username
            );
            session.known = true;
        }
        None => match insert_user(&state, &form, &name).await {
            Ok(new_user) => {
                info!(
                    "User registered with ID: {}, username: {}",
                    new_user.id, new_user.username
                );
                session.known = false;
                dispatch_registration_notice(&state, &form, &new_user).await;
            }
            Err(db_error) if is_unique_violation(&db_error) => {
                // Lost the race against a concurrent submission of the same
                // key; the outcome is the same as the pre-check duplicate.
                warn!("Unique constraint hit after pre-check, treating as duplicate");
                session.known = true;
            }
            Err(db_error) => {
                error!("Failed to persist registration: {}", db_error);
                return Err(AppError::Database(db_error));
            }
        },
    }

    session.name = Some(name);
    let cookie = store_session(&state, &headers, session).await;
    Ok(redirect_with_cookie(&state, cookie))
}

async fn load_session(state: &AppState, headers: &HeaderMap) -> SessionData {
    match SessionCookie::from_headers(headers, &state.config.secret_key) {
        Some(cookie) => state
            .sessions
            .get(&cookie.session_id)
            .await
            .unwrap_or_default(),
        None => SessionData::default(),
    }
}

async fn store_session(
    state: &AppState,
    headers: &HeaderMap,
    data: SessionData,
) -> SessionCookie {
    let cookie = SessionCookie::from_headers(headers, &state.config.secret_key)
        .unwrap_or_else(SessionCookie::issue);
    state.sessions.insert(cookie.session_id.clone(), data).await;
    cookie
}

async fn render_display_state(
    state: &AppState,
    session: &SessionData,
    errors: &[validation::FieldError],
    submitted: Option<&RegistrationForm>,
) -> Result<Html<String>, AppError> {
    let users = user::Entity::find().all(&state.db).await?;
    let roles = role::Entity::find().all(&state.db).await?;
    debug!("Rendering display state with {} user(s)", users.len());
    let grouped = group_users_by_role(&roles, &users);
    Ok(views::index_page(
        state.config.profile,
        session,
        errors,
        submitted,
        &users,
        &roles,
        &grouped,
    ))
}

fn group_users_by_role(
    roles: &[role::Model],
    users: &[user::Model],
) -> Vec<(String, Vec<String>)> {
    roles
        .iter()
        .map(|r| {
            let members = users
                .iter()
                .filter(|u| u.role_id == Some(r.id))
                .map(|u| u.username.clone())
                .collect();
            (r.name.clone(), members)
        })
        .collect()
}

async fn insert_user(
    state: &AppState,
    form: &RegistrationForm,
    name: &str,
) -> Result<user::Model, DbErr> {
    let profile = state.config.profile;

    let role_id = if profile.collects_role() {
        match form.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(role_name) => {
                let found = role::Entity::find()
                    .filter(role::Column::Name.eq(role_name))
                    .one(&state.db)
                    .await?;
                if found.is_none() {
                    warn!("Submitted role '{}' does not exist, registering without it", role_name);
                }
                found.map(|r| r.id)
            }
            None => None,
        }
    } else {
        None
    };

    let prontuario = if profile.collects_prontuario() {
        form.prontuario.as_deref().map(|p| p.trim().to_string())
    } else {
        None
    };

    let new_user = user::ActiveModel {
        username: Set(name.to_string()),
        prontuario: Set(prontuario),
        role_id: Set(role_id),
        ..Default::default()
    };
    new_user.insert(&state.db).await
}

fn is_unique_violation(err: &DbErr) -> bool {
    let message = match err {
        DbErr::Exec(exec_err) => exec_err.to_string(),
        DbErr::Query(query_err) => query_err.to_string(),
        _ => return false,
    };
    let message = message.to_lowercase();
    message.contains("unique") || message.contains("constraint")
}

/// Notify the administrator (and the optional extra recipient) of a new
/// registration. Delivery problems stay inside the dispatcher.
async fn dispatch_registration_notice(
    state: &AppState,
    form: &RegistrationForm,
    new_user: &user::Model,
) {
    let mut recipients = Vec::new();
    if let Some(admin) = state.mailer.admin_recipient() {
        recipients.push(admin);
    }
    if state.config.profile.collects_copy_to() {
        if let Some(extra) = form
            .copy_to
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            recipients.push(extra.to_string());
        }
    }

    let body = match &new_user.prontuario {
        Some(p) => format!("{} ({}) has just registered.", new_user.username, p),
        None => format!("{} has just registered.", new_user.username),
    };

    let outcome = state.mailer.send(&recipients, "New user registered", &body).await;
    debug!("Notification outcome: {:?}", outcome);
}

fn redirect_with_cookie(state: &AppState, cookie: SessionCookie) -> Response {
    // 302 back to the display state so a refresh cannot resubmit the form
    Response::builder()
        .status(StatusCode::FOUND)
        .header(
            header::SET_COOKIE,
            cookie.to_cookie_header(&state.config.secret_key),
        )
        .header(header::LOCATION, "/")
        .body(Body::empty())
        .unwrap()
        .into_response()
}

//! Server-rendered pages. Pages are small enough that they are assembled
//! inline; the shared look lives in `PAGE_STYLE`.

use axum::response::Html;

use crate::config::RegistrationProfile;
use crate::handlers::register::RegistrationForm;
use crate::session::SessionData;
use crate::validation::{FieldError, PRONTUARIO_TAKEN_MESSAGE};
use model::entities::{role, user};

const PAGE_STYLE: &str = r#"
        body { font-family: system-ui, sans-serif; max-width: 640px; margin: 40px auto; padding: 0 20px; }
        h1 { font-size: 28px; margin-bottom: 4px; }
        h2 { font-size: 20px; margin-top: 32px; }
        label { display: block; margin-top: 12px; }
        input, select { padding: 6px; margin-top: 4px; width: 280px; }
        button { margin-top: 16px; padding: 8px 20px; }
        .notice { color: #155724; background: #d4edda; padding: 8px 12px; border-radius: 4px; }
        .error { color: #721c24; margin: 4px 0 0 0; }
        ul { padding-left: 20px; }
"#;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn field_error_html(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| format!(r#"<p class="error">{}</p>"#, html_escape(&e.message)))
        .collect()
}

fn greeting_html(session: &SessionData) -> String {
    let name = session
        .name
        .as_deref()
        .map(html_escape)
        .unwrap_or_else(|| "Stranger".to_string());

    let notice = if session.name.is_none() {
        String::new()
    } else if session.known {
        format!(
            r#"<p class="notice">{} Please submit a different one if this is not you.</p>"#,
            html_escape(PRONTUARIO_TAKEN_MESSAGE)
        )
    } else {
        r#"<p class="notice">Pleased to meet you!</p>"#.to_string()
    };

    format!("<h1>Hello, {name}!</h1>\n            {notice}")
}

fn form_html(
    profile: RegistrationProfile,
    errors: &[FieldError],
    submitted: Option<&RegistrationForm>,
    roles: &[role::Model],
) -> String {
    let name_value = submitted.map(|f| html_escape(&f.name)).unwrap_or_default();
    let mut fields = format!(
        r#"<label>
                    What is your name?
                    <input type="text" name="name" value="{name_value}" autofocus>
                </label>
                {name_errors}"#,
        name_errors = field_error_html(errors, "name"),
    );

    if profile.collects_role() {
        let selected = submitted.and_then(|f| f.role.as_deref()).unwrap_or_default();
        let options: String = roles
            .iter()
            .map(|r| {
                let name = html_escape(&r.name);
                let marker = if r.name == selected { " selected" } else { "" };
                format!(r#"<option value="{name}"{marker}>{name}</option>"#)
            })
            .collect();
        fields.push_str(&format!(
            r#"
                <label>
                    Role:
                    <select name="role">
                        <option value=""></option>
                        {options}
                    </select>
                </label>"#
        ));
    }

    if profile.collects_prontuario() {
        let value = submitted
            .and_then(|f| f.prontuario.as_deref())
            .map(html_escape)
            .unwrap_or_default();
        fields.push_str(&format!(
            r#"
                <label>
                    Prontuario:
                    <input type="text" name="prontuario" value="{value}">
                </label>
                {errors}"#,
            errors = field_error_html(errors, "prontuario"),
        ));
    }

    if profile.collects_copy_to() {
        let value = submitted
            .and_then(|f| f.copy_to.as_deref())
            .map(html_escape)
            .unwrap_or_default();
        fields.push_str(&format!(
            r#"
                <label>
                    Also notify (optional email):
                    <input type="text" name="copy_to" value="{value}">
                </label>"#
        ));
    }

    format!(
        r#"<form method="POST" action="/">
                {fields}
                <button type="submit">Submit</button>
            </form>"#
    )
}

fn user_list_html(users: &[user::Model]) -> String {
    if users.is_empty() {
        return "<p>No users registered yet.</p>".to_string();
    }
    let items: String = users
        .iter()
        .map(|u| match &u.prontuario {
            Some(p) => format!(
                "<li>{} ({})</li>",
                html_escape(&u.username),
                html_escape(p)
            ),
            None => format!("<li>{}</li>", html_escape(&u.username)),
        })
        .collect();
    format!("<ul>{items}</ul>")
}

fn roles_html(grouped: &[(String, Vec<String>)]) -> String {
    let rows: String = grouped
        .iter()
        .filter(|(_, names)| !names.is_empty())
        .map(|(role_name, names)| {
            let joined = names
                .iter()
                .map(|n| html_escape(n))
                .collect::<Vec<_>>()
                .join(", ");
            format!("<li><strong>{}</strong>: {}</li>", html_escape(role_name), joined)
        })
        .collect();
    if rows.is_empty() {
        String::new()
    } else {
        format!("<h2>Users by role</h2>\n            <ul>{rows}</ul>")
    }
}

pub fn index_page(
    profile: RegistrationProfile,
    session: &SessionData,
    errors: &[FieldError],
    submitted: Option<&RegistrationForm>,
    users: &[user::Model],
    roles: &[role::Model],
    grouped: &[(String, Vec<String>)],
) -> Html<String> {
    let greeting = greeting_html(session);
    let form = form_html(profile, errors, submitted, roles);
    let user_list = user_list_html(users);
    let roles_section = roles_html(grouped);

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Cadastro</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>{PAGE_STYLE}</style>
</head>
<body>
    {greeting}
    {form}
    <h2>Registered users</h2>
    {user_list}
    {roles_section}
</body>
</html>
"#
    ))
}

pub fn not_found_page() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Not Found</title>
    <style>{PAGE_STYLE}</style>
</head>
<body>
    <h1>Not Found</h1>
    <p>The page you requested does not exist.</p>
    <p><a href="/">Back to the registration page</a></p>
</body>
</html>
"#
    ))
}

pub fn internal_error_page() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Internal Error</title>
    <style>{PAGE_STYLE}</style>
</head>
<body>
    <h1>Internal Error</h1>
    <p>Something went wrong while handling your request. Please try again later.</p>
    <p><a href="/">Back to the registration page</a></p>
</body>
</html>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::PRONTUARIO_FORMAT_MESSAGE;

    fn sample_form(name: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.to_string(),
            role: None,
            prontuario: Some("bad".to_string()),
            copy_to: None,
        }
    }

    #[test]
    fn escapes_markup_in_user_input() {
        assert_eq!(html_escape("<b>&'\""), "&lt;b&gt;&amp;&#x27;&quot;");
    }

    #[test]
    fn index_page_shows_field_errors_and_prefill() {
        let errors = vec![FieldError {
            field: "prontuario",
            message: PRONTUARIO_FORMAT_MESSAGE.to_string(),
        }];
        let form = sample_form("Ana <script>");
        let Html(page) = index_page(
            RegistrationProfile::Prontuario,
            &SessionData::default(),
            &errors,
            Some(&form),
            &[],
            &[],
            &[],
        );

        assert!(page.contains(PRONTUARIO_FORMAT_MESSAGE));
        assert!(page.contains("Ana &lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn known_session_renders_duplicate_notice() {
        let session = SessionData {
            name: Some("Ana".to_string()),
            known: true,
        };
        let Html(page) = index_page(
            RegistrationProfile::Prontuario,
            &session,
            &[],
            None,
            &[],
            &[],
            &[],
        );
        assert!(page.contains("Hello, Ana!"));
        assert!(page.contains(PRONTUARIO_TAKEN_MESSAGE));
    }

    #[test]
    fn role_profile_renders_select_with_options() {
        let roles = vec![
            role::Model {
                id: 1,
                name: "Administrator".to_string(),
            },
            role::Model {
                id: 2,
                name: "Guest".to_string(),
            },
        ];
        let Html(page) = index_page(
            RegistrationProfile::NameRole,
            &SessionData::default(),
            &[],
            None,
            &[],
            &roles,
            &[],
        );
        assert!(page.contains(r#"<select name="role">"#));
        assert!(page.contains(">Administrator<"));
        assert!(page.contains(">Guest<"));
        // No identifier field on this profile
        assert!(!page.contains(r#"name="prontuario""#));
    }
}

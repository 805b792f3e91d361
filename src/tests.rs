#[cfg(test)]
mod integration_tests {
    use crate::config::RegistrationProfile;
    use crate::handlers::register::RegistrationForm;
    use crate::handlers::reset::seed_database;
    use crate::notify::{DispatchOutcome, MailSettings, Mailer};
    use crate::router::create_router;
    use crate::schemas::ApiResponse;
    use crate::test_utils::test_utils::{
        setup_app_state_with_config, setup_test_app, setup_test_app_state, test_config,
    };
    use crate::validation::{PRONTUARIO_FORMAT_MESSAGE, PRONTUARIO_TAKEN_MESSAGE};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use model::entities::{role, user};
    use sea_orm::EntityTrait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn registration(name: &str, prontuario: Option<&str>) -> RegistrationForm {
        RegistrationForm {
            name: name.to_string(),
            role: None,
            prontuario: prontuario.map(|p| p.to_string()),
            copy_to: None,
        }
    }

    /// Spin up a local stand-in for the mail provider that answers every
    /// message POST with `status`, recording hit count and request bodies.
    async fn spawn_mock_provider(
        status: StatusCode,
    ) -> (String, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let recorded_hits = hits.clone();
        let recorded_bodies = bodies.clone();

        let app = axum::Router::new().route(
            "/:domain/messages",
            axum::routing::post(move |body: String| {
                let recorded_hits = recorded_hits.clone();
                let recorded_bodies = recorded_bodies.clone();
                async move {
                    recorded_hits.fetch_add(1, Ordering::SeqCst);
                    recorded_bodies.lock().unwrap().push(body);
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock provider");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), hits, bodies)
    }

    fn mock_mail_settings(api_base: &str) -> MailSettings {
        MailSettings {
            api_key: Some("key-test".to_string()),
            domain: Some("mail.example.test".to_string()),
            api_base: api_base.to_string(),
            sender: "Cadastro <noreply@example.test>".to_string(),
            admin: Some("admin@example.test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_page_renders_form() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/").await;

        response.assert_status(StatusCode::OK);
        let page = response.text();
        assert!(page.contains("Hello, Stranger!"));
        assert!(page.contains(r#"name="name""#));
        assert!(page.contains(r#"name="prontuario""#));
        assert!(page.contains("No users registered yet."));
    }

    #[tokio::test]
    async fn test_registration_creates_user_and_redirects() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let response = server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await;

        // Post/redirect/get: the browser must not resubmit on refresh
        response.assert_status(StatusCode::FOUND);
        assert_eq!(response.header("location"), "/");

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "Ana");
        assert_eq!(users[0].prontuario.as_deref(), Some("abc1234567"));
    }

    #[tokio::test]
    async fn test_new_registration_greets_with_known_false() {
        let state = setup_test_app_state().await;
        let mut server = TestServer::new(create_router(state)).unwrap();
        server.do_save_cookies();

        let response = server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await;
        response.assert_status(StatusCode::FOUND);

        let page = server.get("/").await.text();
        assert!(page.contains("Hello, Ana!"));
        assert!(page.contains("Pleased to meet you!"));
        assert!(!page.contains(PRONTUARIO_TAKEN_MESSAGE));
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_count_and_sets_known() {
        let state = setup_test_app_state().await;
        let mut server = TestServer::new(create_router(state.clone())).unwrap();
        server.do_save_cookies();

        let first = server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await;
        first.assert_status(StatusCode::FOUND);

        // Same identifier again, even under another name
        let second = server
            .post("/")
            .form(&registration("Ana Clone", Some("abc1234567")))
            .await;
        second.assert_status(StatusCode::FOUND);

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1, "duplicate submission must not create a record");

        let page = server.get("/").await.text();
        assert!(page.contains(PRONTUARIO_TAKEN_MESSAGE));
    }

    #[tokio::test]
    async fn test_malformed_prontuario_is_rejected_inline() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        // Two letters, eight digits
        let response = server
            .post("/")
            .form(&registration("Ana", Some("ab12345678")))
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains(PRONTUARIO_FORMAT_MESSAGE));

        // Four letters, six digits
        let response = server
            .post("/")
            .form(&registration("Ana", Some("abcd123456")))
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains(PRONTUARIO_FORMAT_MESSAGE));

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert!(users.is_empty(), "rejected submissions must not create records");
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected_inline() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let response = server
            .post("/")
            .form(&registration("   ", Some("abc1234567")))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Please tell us your name."));

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_name_only_profile_uses_username_as_key() {
        let config = test_config(RegistrationProfile::NameOnly);
        let state = setup_app_state_with_config(config).await;
        let mut server = TestServer::new(create_router(state.clone())).unwrap();
        server.do_save_cookies();

        let first = server.post("/").form(&registration("Ana", None)).await;
        first.assert_status(StatusCode::FOUND);

        let second = server.post("/").form(&registration("Ana", None)).await;
        second.assert_status(StatusCode::FOUND);

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].prontuario.is_none());

        let page = server.get("/").await.text();
        assert!(page.contains(PRONTUARIO_TAKEN_MESSAGE));
    }

    #[tokio::test]
    async fn test_role_profile_attaches_role() {
        let config = test_config(RegistrationProfile::NameRole);
        let state = setup_app_state_with_config(config).await;
        seed_database(&state.db).await.unwrap();
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let mut form = registration("Clara", None);
        form.role = Some("Guest".to_string());
        let response = server.post("/").form(&form).await;
        response.assert_status(StatusCode::FOUND);

        let response = server.get("/api/v1/users").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert!(body.success);
        let clara = body
            .data
            .iter()
            .find(|u| u["username"] == "Clara")
            .expect("Clara should be registered");
        assert_eq!(clara["role"], "Guest");
    }

    #[tokio::test]
    async fn test_reset_route_seeds_roles_and_users() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        // Put something in first so the reset provably wipes it
        server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await
            .assert_status(StatusCode::FOUND);

        let response = server.get("/reset-db").await;
        response.assert_status(StatusCode::SEE_OTHER);

        let roles = role::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(roles.len(), 3);
        let role_names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        for expected in ["Administrator", "User", "Guest"] {
            assert!(role_names.contains(&expected), "missing role {}", expected);
        }

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 3);
        let usernames: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        for expected in ["Admin", "User", "Guest"] {
            assert!(usernames.contains(&expected), "missing user {}", expected);
        }
    }

    #[tokio::test]
    async fn test_api_users_lists_seeded_users_with_roles() {
        let state = setup_test_app_state().await;
        seed_database(&state.db).await.unwrap();
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/api/v1/users").await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Users retrieved successfully");
        assert_eq!(body.data.len(), 3);
        let admin = body.data.iter().find(|u| u["username"] == "Admin").unwrap();
        assert_eq!(admin["role"], "Administrator");
    }

    #[tokio::test]
    async fn test_unknown_route_renders_not_found_page() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/no-such-page").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("The page you requested does not exist."));
    }

    #[tokio::test]
    async fn test_internal_error_renders_fixed_page() {
        use sea_orm::ConnectionTrait;

        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        // Break the schema behind the handler's back
        state
            .db
            .execute_unprepared("DROP TABLE users;")
            .await
            .unwrap();

        let response = server.get("/").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("Internal Error"));
    }

    #[tokio::test]
    async fn test_registration_succeeds_without_mail_configuration() {
        // Default test state has no provider key, so dispatch is skipped
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let response = server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await;

        response.assert_status(StatusCode::FOUND);
        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_notification_attempted_only_for_new_records() {
        let (api_base, hits, bodies) = spawn_mock_provider(StatusCode::OK).await;
        let mut config = test_config(RegistrationProfile::Prontuario);
        config.mail = mock_mail_settings(&api_base);
        let state = setup_app_state_with_config(config).await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let mut form = registration("Ana", Some("abc1234567"));
        form.copy_to = Some("copy@example.test".to_string());
        server.post("/").form(&form).await.assert_status(StatusCode::FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // The admin and the requested extra recipient are both addressed
        let body = bodies.lock().unwrap().first().cloned().unwrap();
        assert!(body.contains("admin%40example.test"));
        assert!(body.contains("copy%40example.test"));

        // The duplicate path must not notify
        server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await
            .assert_status(StatusCode::FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_registration_commits_when_provider_rejects() {
        let (api_base, hits, _bodies) = spawn_mock_provider(StatusCode::INTERNAL_SERVER_ERROR).await;
        let mut config = test_config(RegistrationProfile::Prontuario);
        config.mail = mock_mail_settings(&api_base);
        let state = setup_app_state_with_config(config).await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let response = server
            .post("/")
            .form(&registration("Ana", Some("abc1234567")))
            .await;

        // Delivery failed, registration did not
        response.assert_status(StatusCode::FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let users = user::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_mailer_reports_outcome_per_provider_response() {
        let (ok_base, _hits, _bodies) = spawn_mock_provider(StatusCode::OK).await;
        let mailer = Mailer::new(mock_mail_settings(&ok_base));
        let outcome = mailer
            .send(&["admin@example.test".to_string()], "New user registered", "Ana")
            .await;
        assert_eq!(outcome, DispatchOutcome::Sent);

        let (err_base, _hits, _bodies) = spawn_mock_provider(StatusCode::BAD_GATEWAY).await;
        let mailer = Mailer::new(mock_mail_settings(&err_base));
        let outcome = mailer
            .send(&["admin@example.test".to_string()], "New user registered", "Ana")
            .await;
        assert_eq!(outcome, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_mailer_reports_failed_on_unreachable_provider() {
        // Nothing listens on this port
        let mailer = Mailer::new(mock_mail_settings("http://127.0.0.1:1"));
        let outcome = mailer
            .send(&["admin@example.test".to_string()], "New user registered", "Ana")
            .await;
        assert_eq!(outcome, DispatchOutcome::Failed);
    }
}

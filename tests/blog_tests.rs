mod common;

use axum::http::StatusCode;
use common::{PASSWORD, body_json, form, location, spawn_app};

fn titles(page: &serde_json::Value) -> Vec<String> {
    page["context"]["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_index_lists_visible_posts_newest_first() {
    let app = spawn_app().await;
    app.create_post("alice", "First", &[], true).await;
    app.create_post("alice", "Hidden draft", &[], false).await;
    app.create_post("alice", "Second", &[], true).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    assert_eq!(page["template"], "blog/index.html");
    assert_eq!(titles(&page), vec!["Second", "First"]);
    assert!(page["context"]["user"].is_null());
}

#[tokio::test]
async fn test_tag_filter_matches_substring_of_tag_name() {
    let app = spawn_app().await;
    app.create_post("alice", "Snakes", &["python"], true).await;
    app.create_post("alice", "Beans", &["coffee"], true).await;

    let page = body_json(app.get("/tag/py/", None).await).await;
    assert_eq!(page["template"], "blog/tag.html");
    assert_eq!(page["context"]["tag"], "py");
    assert_eq!(titles(&page), vec!["Snakes"]);

    let page = body_json(app.get("/tag/java/", None).await).await;
    assert!(titles(&page).is_empty());
}

#[tokio::test]
async fn test_empty_search_equals_index() {
    let app = spawn_app().await;
    app.create_post("alice", "One", &["a"], true).await;
    app.create_post("bob", "Two", &[], true).await;
    app.create_post("bob", "Three", &["b"], true).await;

    let index = body_json(app.get("/", None).await).await;
    let search = body_json(app.get("/search/?q=", None).await).await;
    assert_eq!(search["template"], "blog/search.html");
    assert_eq!(titles(&index), titles(&search));

    let missing_param = body_json(app.get("/search/", None).await).await;
    assert_eq!(titles(&index), titles(&missing_param));
}

#[tokio::test]
async fn test_search_ignores_case_and_wildcards() {
    let app = spawn_app().await;
    app.create_post("alice", "Learning Rust", &[], true).await;
    app.create_post("alice", "Gardening", &["Outdoors"], true).await;
    app.create_post("alice", "100% effort", &[], true).await;

    let page = body_json(app.get("/search/?q=rUsT", None).await).await;
    assert_eq!(titles(&page), vec!["Learning Rust"]);

    let page = body_json(app.get("/search/?q=OUTDOOR", None).await).await;
    assert_eq!(titles(&page), vec!["Gardening"]);

    let page = body_json(app.get("/search/?q=%25", None).await).await;
    assert_eq!(titles(&page), vec!["100% effort"]);
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let app = spawn_app().await;
    app.create_post("alice", "ÜBER Straße", &["Ärger"], true).await;
    app.create_post("alice", "Plain", &[], true).await;

    for q in ["%C3%BCber", "%C3%9CBER", "STRA%C3%9FE"] {
        let page = body_json(app.get(&format!("/search/?q={q}"), None).await).await;
        assert_eq!(titles(&page), vec!["ÜBER Straße"], "{q}");
    }

    let page = body_json(app.get("/search/?q=%C3%A4rger", None).await).await;
    assert_eq!(titles(&page), vec!["ÜBER Straße"]);

    let page = body_json(app.get("/tag/%C3%A4rg/", None).await).await;
    assert_eq!(titles(&page), vec!["ÜBER Straße"]);
}

#[tokio::test]
async fn test_post_detail_and_missing_posts() {
    let app = spawn_app().await;
    let post = app.create_post("alice", "Readable", &["notes"], true).await;

    let response = app.get(&format!("/post/{}/", post.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["template"], "blog/post.html");
    assert_eq!(page["context"]["post"]["title"], "Readable");
    assert_eq!(page["context"]["post"]["tags"][0]["name"], "notes");
    assert_eq!(page["context"]["can_edit"], false);

    for uri in ["/post/9999/", "/post/abc/", "/post/-1/", "/no-such-page/"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_json(response).await["template"], "404.html");
    }
}

#[tokio::test]
async fn test_hidden_post_visible_only_to_owner() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    app.create_user("bob", "bob@example.com", true).await;
    let post = app.create_post("alice", "Draft", &[], false).await;
    let uri = format!("/post/{}/", post.id);

    assert_eq!(app.get(&uri, None).await.status(), StatusCode::NOT_FOUND);

    let bob = app.login("bob", PASSWORD).await;
    assert_eq!(app.get(&uri, Some(&bob)).await.status(), StatusCode::NOT_FOUND);

    let alice = app.login("alice", PASSWORD).await;
    let response = app.get(&uri, Some(&alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["context"]["can_edit"], true);
}

#[tokio::test]
async fn test_anonymous_comment_redirects_and_is_listed() {
    let app = spawn_app().await;
    let post = app.create_post("alice", "Open thread", &[], true).await;
    let uri = format!("/post/{}/", post.id);

    let response = app
        .post_form(
            &uri,
            form(&[("author", "Visitor"), ("body", "Nice post!")]),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), uri);

    let page = body_json(app.get(&uri, None).await).await;
    let comments = page["context"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["author"], "Visitor");
    assert_eq!(comments[0]["content"], "Nice post!");
}

#[tokio::test]
async fn test_invalid_comment_rerenders_with_errors() {
    let app = spawn_app().await;
    let post = app.create_post("alice", "Thread", &[], true).await;
    let uri = format!("/post/{}/", post.id);

    let long_author = "x".repeat(51);
    let response = app
        .post_form(&uri, form(&[("author", &long_author), ("body", "")]), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    assert_eq!(page["template"], "blog/post.html");
    assert!(page["context"]["errors"]["author"].is_array());
    assert!(page["context"]["errors"]["body"].is_array());
    assert_eq!(page["context"]["form"]["author"], long_author);
    assert!(page["context"]["comments"].as_array().unwrap().is_empty());

    let response = app
        .post_form("/post/9999/", form(&[("author", "a"), ("body", "b")]), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_required_pages_redirect_anonymous_users() {
    let app = spawn_app().await;
    let post = app.create_post("alice", "Guarded", &[], true).await;

    for uri in ["/addpost/".to_string(), format!("/editpost/{}/", post.id), "/profile/".to_string()] {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(
            location(&response),
            format!("/accounts/login/?next={}", urlencoding::encode(&uri))
        );
    }

    let response = app
        .post_form(&format!("/deletepost/{}/", post.id), String::new(), None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).starts_with("/accounts/login/"));
    assert!(app.shared.store.get_post(post.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_post_uses_logged_in_author() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let cookie = app.login("alice", PASSWORD).await;

    let response = app.get("/addpost/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["template"], "blog/addpost.html");
    assert_eq!(page["context"]["form"]["visible"], true);

    let response = app
        .post_form(
            "/addpost/",
            form(&[
                ("title", "Mine"),
                ("content", "Written by me"),
                ("author", "mallory"),
                ("visible", "on"),
                ("new_tags", "Rust, rust, web"),
            ]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let page = body_json(app.get("/", None).await).await;
    let post = &page["context"]["posts"][0];
    assert_eq!(post["title"], "Mine");
    assert_eq!(post["author"], "alice");
    let tags: Vec<&str> = post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["Rust", "web"]);

    let created = &post["created_at"];
    assert_eq!(created, &post["last_modified"]);
}

#[tokio::test]
async fn test_create_post_with_existing_and_unknown_tags() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let cookie = app.login("alice", PASSWORD).await;
    let tag = app.shared.store.get_or_create_tag("python").await.unwrap();
    let tag_id = tag.id.to_string();

    let response = app
        .post_form(
            "/addpost/",
            form(&[
                ("title", "Tagged"),
                ("content", "x"),
                ("visible", "on"),
                ("tags", &tag_id),
                ("new_tags", "PYTHON"),
            ]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let page = body_json(app.get("/tag/python/", None).await).await;
    assert_eq!(page["context"]["posts"][0]["tags"].as_array().unwrap().len(), 1);
    assert_eq!(app.shared.store.list_tags().await.unwrap().len(), 1);

    let response = app
        .post_form(
            "/addpost/",
            form(&[("title", "Ghost tag"), ("content", "x"), ("tags", "9999")]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert!(page["context"]["errors"]["tags"].is_array());
}

#[tokio::test]
async fn test_invalid_post_form_rerenders() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let cookie = app.login("alice", PASSWORD).await;

    let response = app
        .post_form(
            "/addpost/",
            form(&[
                ("title", ""),
                ("content", "Body"),
                ("featured_image_url", "not a url"),
            ]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    assert_eq!(page["template"], "blog/addpost.html");
    assert!(page["context"]["errors"]["title"].is_array());
    assert!(page["context"]["errors"]["featured_image_url"].is_array());
    assert_eq!(page["context"]["form"]["content"], "Body");
    assert!(app.shared.store.list_visible_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_can_edit_post() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let post = app.create_post("alice", "Before", &["old"], true).await;
    let cookie = app.login("alice", PASSWORD).await;
    let uri = format!("/editpost/{}/", post.id);

    let page = body_json(app.get(&uri, Some(&cookie)).await).await;
    assert_eq!(page["template"], "blog/editpost.html");
    assert_eq!(page["context"]["post_id"], post.id);
    assert_eq!(page["context"]["form"]["title"], "Before");

    let response = app
        .post_form(
            &uri,
            form(&[
                ("title", "After"),
                ("content", "New body"),
                ("new_tags", "fresh"),
            ]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let updated = app.shared.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "After");
    assert!(!updated.visible);
    assert_eq!(updated.author, "alice");
    assert_eq!(updated.created_at, post.created_at);
    assert!(updated.created_at <= updated.last_modified);
    let tags: Vec<_> = updated.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tags, vec!["fresh"]);
}

#[tokio::test]
async fn test_non_owner_edit_redirects_and_leaves_post_unchanged() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    app.create_user("bob", "bob@example.com", true).await;
    let post = app.create_post("alice", "Alice's words", &[], true).await;
    let bob = app.login("bob", PASSWORD).await;
    let uri = format!("/editpost/{}/", post.id);

    let response = app.get(&uri, Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    for body in [
        form(&[("title", "Hijacked"), ("content", "pwned"), ("visible", "on")]),
        form(&[("title", ""), ("content", "")]),
    ] {
        let response = app.post_form(&uri, body, Some(&bob)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    let unchanged = app.shared.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "Alice's words");
    assert_eq!(unchanged.content, post.content);
    assert_eq!(unchanged.last_modified, post.last_modified);

    let response = app
        .post_form(&format!("/deletepost/{}/", post.id), String::new(), Some(&bob))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert!(app.shared.store.get_post(post.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_superuser_can_edit_any_post() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let admin = app.create_user("admin", "admin@example.com", true).await;
    app.shared
        .store
        .set_user_superuser(admin.id, true)
        .await
        .unwrap();
    let post = app.create_post("alice", "Typo", &[], true).await;
    let cookie = app.login("admin", PASSWORD).await;

    let response = app
        .post_form(
            &format!("/editpost/{}/", post.id),
            form(&[("title", "Fixed"), ("content", "x"), ("visible", "on")]),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let updated = app.shared.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Fixed");
    assert_eq!(updated.author, "alice");
}

#[tokio::test]
async fn test_delete_removes_post_and_comments() {
    let app = spawn_app().await;
    app.create_user("alice", "alice@example.com", true).await;
    let post = app.create_post("alice", "Doomed", &["gone"], true).await;
    let detail = format!("/post/{}/", post.id);

    for body in ["first", "second"] {
        let response = app
            .post_form(&detail, form(&[("author", "Visitor"), ("body", body)]), None)
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }
    assert_eq!(app.shared.store.count_comments(post.id).await.unwrap(), 2);

    let cookie = app.login("alice", PASSWORD).await;
    let response = app
        .post_form(&format!("/deletepost/{}/", post.id), String::new(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    assert!(app.shared.store.get_post(post.id).await.unwrap().is_none());
    assert_eq!(app.shared.store.count_comments(post.id).await.unwrap(), 0);
    assert_eq!(app.get(&detail, None).await.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_form(&format!("/deletepost/{}/", post.id), String::new(), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_and_metrics_endpoint() {
    let app = spawn_app().await;

    let response = app.get("/", None).await;
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let response = app.get("/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = spawn_app().await;

    let response = app.get("/", None).await;
    let minted = response.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(minted.len(), 36);
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let request = axum::http::Request::builder()
        .uri("/search/?q=x")
        .header("x-request-id", "edge-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-42");
}

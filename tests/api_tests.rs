//! API wrapper tests using WireMock
//!
//! Check the paths, query strings and bodies each wrapper sends, and that the
//! `data` member of the envelope comes back decoded.

use miniapp_client::api::article::ArticleQuery;
use miniapp_client::api::catalog::{ProductSearch, ProductSort};
use miniapp_client::api::comment::{CommentQuery, CommentSort, NewComment};
use miniapp_client::api::common::SortOrder;
use miniapp_client::api::favorite::{FavoriteTarget, FavoriteType};
use miniapp_client::api::MiniappApi;
use miniapp_client::{Miniapp, MiniappError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_app(mock_server: &MockServer) -> Miniapp {
    Miniapp::builder()
        .base_url(mock_server.uri())
        .build()
        .unwrap()
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 200, "message": "ok", "data": data}))
}

#[tokio::test]
async fn test_favorite_toggle_returns_payload_unchanged() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/miniapp/api/favorite/toggle"))
        .and(body_json(json!({"item_type": "article", "item_id": 12})))
        .respond_with(ok(json!({"is_favorited": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let status = app.favorites().toggle(FavoriteTarget::article(12)).await.unwrap();

    assert!(status.is_favorited);
    assert_eq!(status.item_type, None);
    assert_eq!(status.item_id, None);
}

#[tokio::test]
async fn test_transport_returns_toggle_body_unchanged() {
    let body = json!({"code": 200, "message": "ok", "data": {"is_favorited": true}});

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/miniapp/api/favorite/toggle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let answer: serde_json::Value = app
        .transport()
        .post(
            "/miniapp/api/favorite/toggle",
            &FavoriteTarget::product(3),
        )
        .await
        .unwrap();

    assert_eq!(answer, body);
}

#[tokio::test]
async fn test_favorite_list_and_stats() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/miniapp/api/favorite/list"))
        .and(query_param("type", "product"))
        .and(query_param("page", "2"))
        .respond_with(ok(json!({
            "favorites": [{"id": 5, "item_type": "product", "item_id": 40, "item_title": "Tea"}],
            "pagination": {"page": 2, "per_page": 10, "total": 11, "pages": 2, "has_next": false, "has_prev": true}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/miniapp/api/favorite/count"))
        .respond_with(ok(json!({"total": 3, "article": 1, "product": 2})))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let favorites = app.favorites();

    let list = favorites
        .list(Some(FavoriteType::Product), Some(2), None)
        .await
        .unwrap();
    assert_eq!(list.favorites[0].item_title, "Tea");
    assert!(list.pagination.has_prev);

    let stats = favorites.stats().await.unwrap();
    assert_eq!((stats.total, stats.article, stats.product), (3, 1, 2));
    assert_eq!(favorites.api_name(), "favorite");
}

#[tokio::test]
async fn test_cart_operations() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/miniapp/api/cart"))
        .and(body_json(json!({"product_id": 7, "quantity": 2})))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/miniapp/api/cart/31"))
        .and(body_json(json!({"quantity": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/miniapp/api/cart/31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let cart = app.cart();

    cart.add(7, 2).await.unwrap();
    cart.update_quantity(31, 5).await.unwrap();
    cart.remove(31).await.unwrap();
}

#[tokio::test]
async fn test_catalog_home_and_search() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/miniapp/home/data"))
        .respond_with(ok(json!({
            "banners": [{"id": 1, "image": "/b1.png", "link_type": "product", "link_value": 9}],
            "categories": [{"id": 2, "name": "Tea", "imageUrl": "/c.png"}],
            "hot_products": [{"id": 9, "name": "Green tea", "price": 1200}]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/miniapp/product/search"))
        .and(query_param("keyword", "oolong"))
        .and(query_param("sort_by", "price"))
        .and(query_param("sort_order", "asc"))
        .respond_with(ok(json!({
            "products": [{"id": 4, "name": "Oolong", "price": 3000}],
            "total": 1, "pages": 1, "page": 1, "per_page": 10
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let catalog = app.catalog();

    let home = catalog.home_data().await.unwrap();
    assert_eq!(home.banners.len(), 1);
    assert_eq!(home.categories[0].name, "Tea");
    assert_eq!(home.hot_products[0].id, 9);

    let search = ProductSearch {
        sort_by: Some(ProductSort::Price),
        sort_order: Some(SortOrder::Asc),
        ..ProductSearch::keyword("oolong")
    };
    let result = catalog.search(&search).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.products[0].name, "Oolong");
}

#[tokio::test]
async fn test_hot_products_paging() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/miniapp/hot-products"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "6"))
        .respond_with(ok(json!({
            "items": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "pagination": {"page": 1, "per_page": 6, "total": 2, "pages": 1}
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let page = app.catalog().hot_products(1, 6).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pagination.total, 2);
}

#[tokio::test]
async fn test_article_list_and_like() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article/list"))
        .and(query_param("category", "news"))
        .respond_with(ok(json!({
            "articles": [
                {"id": 1, "title": "First", "author": "Editor"},
                {"id": 2, "title": "Second", "author": {"id": 3, "nickname": "Kim"}}
            ],
            "total": 2, "pages": 1, "page": 1, "per_page": 10
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/article/2/like"))
        .respond_with(ok(json!({"likes": 8})))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let articles = app.articles();

    let query = ArticleQuery {
        category: Some("news".to_string()),
        ..Default::default()
    };
    let list = articles.list(&query).await.unwrap();
    let names: Vec<_> = list
        .articles
        .iter()
        .map(|a| a.author.as_ref().and_then(|x| x.display_name()))
        .collect();
    assert_eq!(names, vec![Some("Editor"), Some("Kim")]);

    assert_eq!(articles.like(2).await.unwrap().likes, 8);
}

#[tokio::test]
async fn test_comment_create_and_list() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comments/create"))
        .and(body_json(json!({
            "article_id": 9, "content": "re", "parent_id": 1, "reply_to_user_id": 4
        })))
        .respond_with(ok(json!({
            "comment": {"id": 20, "article_id": 9, "content": "re", "parent_id": 1, "level": 1}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/comments/article/9"))
        .and(query_param("sort_by", "like_count"))
        .and(query_param("order", "desc"))
        .respond_with(ok(json!({
            "comments": [{"id": 1, "article_id": 9, "children": [{"id": 20, "article_id": 9}]}],
            "pagination": {"page": 1, "per_page": 20, "total": 1, "pages": 1}
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let comments = app.comments();

    let created = comments
        .create(&NewComment::new(9, "re").reply_to(1, 4))
        .await
        .unwrap();
    assert_eq!(created.id, 20);
    assert_eq!(created.level, 1);

    let query = CommentQuery {
        sort_by: Some(CommentSort::LikeCount),
        order: Some(SortOrder::Desc),
        ..Default::default()
    };
    let list = comments.article_comments(9, query).await.unwrap();
    assert_eq!(list.comments[0].children[0].id, 20);
}

#[tokio::test]
async fn test_missing_data_is_decode_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/miniapp/banners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "message": "ok"})))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let err = app.catalog().banners().await.unwrap_err();
    assert!(matches!(err, MiniappError::Http(_)));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/miniapp/auth/verifyResetCode"))
        .and(body_json(json!({"phone": "13800000000", "code": "1234"})))
        .respond_with(ok(json!({"resetToken": "rt-1"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/miniapp/auth/resetPassword"))
        .and(body_json(json!({"resetToken": "rt-1", "newPassword": "n3w"})))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let auth = app.auth();

    let token = auth.verify_reset_code("13800000000", "1234").await.unwrap();
    assert_eq!(token.reset_token, "rt-1");
    auth.reset_password(&token.reset_token, "n3w").await.unwrap();
}

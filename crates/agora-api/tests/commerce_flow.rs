mod common;

use axum::http::StatusCode;

use agora_types::Cents;
use common::{TestApp, body_text, location};

const CHAIR: &str = "title=Chair&description=Wooden+chair&price=10.00&url=&category=1";

async fn seller_and_bidder(app: &TestApp) -> (String, String) {
    let seller = app.register("/commerce", "seller", "pw1").await;
    let bidder = app.register("/commerce", "bidder", "pw2").await;
    let res = app.post_form("/commerce/new", CHAIR, Some(&seller)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    (seller, bidder)
}

#[tokio::test]
async fn bid_raises_minimum_and_low_bid_is_rejected() {
    let app = TestApp::new().await;
    let (_, bidder) = seller_and_bidder(&app).await;

    let body = body_text(app.get("/commerce/listing/1", Some(&bidder)).await).await;
    assert!(body.contains(r#"<span id="minimum-bid">10.00</span>"#));

    let res = app.post_form("/commerce/bid", "listing_id=1&bid=10.50", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/commerce/listing/1");

    let body = body_text(app.get("/commerce/listing/1", Some(&bidder)).await).await;
    assert!(body.contains(r#"<span id="minimum-bid">10.51</span>"#));
    assert!(body.contains(r#"<h3 id="current-price">$10.50</h3>"#));

    let third = app.register("/commerce", "third", "pw3").await;
    let res = app.post_form("/commerce/bid", "listing_id=1&bid=10.20", Some(&third)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_text(res).await;
    assert!(body.contains("Your bid must be at least $10.51."));
    assert!(body.contains(r#"<h3 id="current-price">$10.50</h3>"#));

    let listing = app.state.db.get_listing(1).unwrap().unwrap();
    assert_eq!(listing.current_price, Cents(1050));
    assert_eq!(listing.starting_price, Cents(1000));
    assert_eq!(app.state.db.bid_count(1).unwrap(), 1);
    assert!(!app.state.db.is_watching(&app.user_id("third"), 1).unwrap());
}

#[tokio::test]
async fn listing_view_never_writes() {
    let app = TestApp::new().await;
    let (_, bidder) = seller_and_bidder(&app).await;
    app.post_form("/commerce/bid", "listing_id=1&bid=12", Some(&bidder)).await;

    for _ in 0..3 {
        assert_eq!(app.get("/commerce/listing/1", None).await.status(), StatusCode::OK);
    }
    let listing = app.state.db.get_listing(1).unwrap().unwrap();
    assert_eq!(listing.current_price, Cents(1200));
    assert_eq!(app.state.db.bid_count(1).unwrap(), 1);
}

#[tokio::test]
async fn bidding_watches_the_listing() {
    let app = TestApp::new().await;
    let (_, bidder) = seller_and_bidder(&app).await;
    app.post_form("/commerce/bid", "listing_id=1&bid=11", Some(&bidder)).await;

    let body = body_text(app.get("/commerce/watch", Some(&bidder)).await).await;
    assert!(body.contains("Chair"));

    app.get("/commerce/delwatch/1", Some(&bidder)).await;
    assert!(!app.state.db.is_watching(&app.user_id("bidder"), 1).unwrap());

    let res = app.get("/commerce/addwatch/1", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(app.state.db.is_watching(&app.user_id("bidder"), 1).unwrap());

    let res = app.get("/commerce/addwatch/42", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_owner_closes() {
    let app = TestApp::new().await;
    let (seller, bidder) = seller_and_bidder(&app).await;

    let res = app.post_form("/commerce/bid", "listing_id=1&bid=10.00", Some(&seller)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    app.post_form("/commerce/bid", "listing_id=1&bid=15", Some(&bidder)).await;

    let res = app.get("/commerce/close/1", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(app.state.db.get_listing(1).unwrap().unwrap().active);

    let res = app.get("/commerce/close/1", Some(&seller)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(!app.state.db.get_listing(1).unwrap().unwrap().active);

    let body = body_text(app.get("/commerce/listing/1", Some(&bidder)).await).await;
    assert!(body.contains("You won this auction!"));

    let res = app.post_form("/commerce/bid", "listing_id=1&bid=20", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("This auction is closed."));
}

#[tokio::test]
async fn new_listing_validation_and_login() {
    let app = TestApp::new().await;

    let res = app.get("/commerce/new", None).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/commerce/login");

    let seller = app.register("/commerce", "seller", "pw1").await;
    let res = app
        .post_form("/commerce/new", "title=Chair&description=x&price=1.234&url=&category=1", Some(&seller))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("Invalid price"));
    assert!(app.state.db.list_listings().unwrap().is_empty());

    let res = app
        .post_form("/commerce/new", "title=Chair&description=x&price=1&url=&category=999", Some(&seller))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_and_categories() {
    let app = TestApp::new().await;
    let (_, bidder) = seller_and_bidder(&app).await;

    let res = app
        .post_form("/commerce/comment", "listing_id=1&content=Is+it+sturdy%3F", Some(&bidder))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let body = body_text(app.get("/commerce/listing/1", None).await).await;
    assert!(body.contains("Is it sturdy?"));

    let res = app.post_form("/commerce/comment", "listing_id=1&content=", Some(&bidder)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_text(app.post_form("/commerce/categories", "category=1", None).await).await;
    assert!(body.contains("Chair"));
    let body = body_text(app.post_form("/commerce/categories", "category=2", None).await).await;
    assert!(body.contains("No listings."));

    let res = app.get("/commerce/listing/77", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_listing_id_is_not_found_page() {
    let app = TestApp::new().await;
    let (seller, _) = seller_and_bidder(&app).await;

    let res = app.get("/commerce/listing/abc", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_text(res).await;
    assert!(body.contains("No such listing."));
    assert!(body.contains("<html"));

    for uri in ["/commerce/addwatch/abc", "/commerce/delwatch/abc", "/commerce/close/abc"] {
        let res = app.get(uri, Some(&seller)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn index_lists_closed_auctions_too() {
    let app = TestApp::new().await;
    let (seller, _) = seller_and_bidder(&app).await;
    app.get("/commerce/close/1", Some(&seller)).await;

    let body = body_text(app.get("/commerce", None).await).await;
    assert!(body.contains("All Listings"));
    assert!(body.contains("Chair"));
    assert!(body.contains("Closed"));
}

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{
    random_email, seed_booking, seed_ticket, seed_user, test_app, token_for, TestApp,
    WEBHOOK_SECRET,
};
use ticket_market::{
    models::{BookingStatus, Role, TicketStatus},
    router,
    services::webhook,
    store::{Store, TicketFilter},
};

struct Client {
    app: Router,
}

impl Client {
    fn new(test: &TestApp) -> Self {
        Self {
            app: router(test.state.clone()),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(email) = as_user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token_for(email)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn get(&self, uri: &str, as_user: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, as_user, None).await
    }
}

#[tokio::test]
async fn health_endpoints_answer() {
    let test = test_app();
    let client = Client::new(&test);

    let (status, body) = client.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn registering_twice_keeps_one_user() {
    let test = test_app();
    let client = Client::new(&test);
    let user = json!({ "email": "a@x.com", "displayName": "A" });

    let (status, body) = client.send(Method::POST, "/users", None, Some(user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");

    let (status, body) = client.send(Method::POST, "/users", None, Some(user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User already exists");

    assert_eq!(test.store.list_users(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn client_cannot_choose_its_role_on_sign_up() {
    let test = test_app();
    let client = Client::new(&test);

    let (status, _) = client
        .send(
            Method::POST,
            "/users",
            None,
            Some(json!({ "email": "sneaky@x.com", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = client.get("/users/sneaky@x.com/role", None).await;
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn role_lookup_defaults_to_user() {
    let test = test_app();
    let client = Client::new(&test);
    seed_user(test.store.as_ref(), "vendor@x.com", Role::Vendor).await;

    let (status, body) = client.get("/users/vendor@x.com/role", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "vendor");

    let (_, body) = client.get("/users/nobody@x.com/role", None).await;
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let test = test_app();
    let client = Client::new(&test);

    let (status, body) = client.get("/my-bookings?email=a@x.com", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn fraud_account_cannot_list_tickets() {
    let test = test_app();
    let client = Client::new(&test);
    let fraud = random_email();
    seed_user(test.store.as_ref(), &fraud, Role::Fraud).await;

    let ticket = json!({
        "title": "Dhaka to Sylhet",
        "fromLocation": "Dhaka",
        "toLocation": "Sylhet",
        "transportType": "train",
        "price": 800,
        "quantity": 40,
    });
    let (status, body) = client
        .send(Method::POST, "/tickets", Some(&fraud), Some(ticket))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not allowed to create a ticket");
    assert!(test
        .store
        .list_tickets(TicketFilter::OwnedBy(&fraud))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn vendor_listing_starts_pending() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;

    let ticket = json!({
        "title": "Dhaka to Sylhet",
        "fromLocation": "Dhaka",
        "toLocation": "Sylhet",
        "transportType": "train",
        "price": 800,
        "quantity": 40,
    });
    let (status, body) = client
        .send(Method::POST, "/tickets", Some(&vendor), Some(ticket.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ticket"]["status"], "pending");
    assert_eq!(body["ticket"]["ownerEmail"], vendor.as_str());

    // Plain users are not vendors.
    let buyer = random_email();
    seed_user(test.store.as_ref(), &buyer, Role::User).await;
    let (status, _) = client
        .send(Method::POST, "/tickets", Some(&buyer), Some(ticket))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn flagging_fraud_purges_their_tickets() {
    let test = test_app();
    let client = Client::new(&test);
    let admin = random_email();
    seed_user(test.store.as_ref(), &admin, Role::Admin).await;
    let vendor = seed_user(test.store.as_ref(), "u@x.com", Role::Vendor).await;
    for _ in 0..3 {
        seed_ticket(test.store.as_ref(), &vendor.email, 10).await;
    }
    let bystander = seed_ticket(test.store.as_ref(), &random_email(), 10).await;

    let uri = format!("/users/fraud/{}", vendor.id);
    let (status, body) = client.send(Method::PATCH, &uri, Some(&admin), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedTickets"], 3);
    assert_eq!(body["user"]["role"], "fraud");
    assert!(test
        .store
        .list_tickets(TicketFilter::OwnedBy(&vendor.email))
        .await
        .unwrap()
        .is_empty());
    assert!(test.store.find_ticket(bystander.id).await.unwrap().is_some());

    let missing = format!("/users/fraud/{}", uuid::Uuid::new_v4());
    let (status, _) = client.send(Method::PATCH, &missing, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_admins_manage_roles() {
    let test = test_app();
    let client = Client::new(&test);
    let admin = random_email();
    seed_user(test.store.as_ref(), &admin, Role::Admin).await;
    let target = seed_user(test.store.as_ref(), &random_email(), Role::User).await;

    let uri = format!("/users/role/{}", target.id);
    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&target.email), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({ "role": "vendor" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "vendor");

    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({ "role": "fraud" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_is_private_and_allow_listed() {
    let test = test_app();
    let client = Client::new(&test);
    let me = random_email();
    let other = random_email();
    seed_user(test.store.as_ref(), &me, Role::User).await;
    seed_user(test.store.as_ref(), &other, Role::User).await;

    let (status, _) = client.get(&format!("/users-profile/{other}"), Some(&me)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client
        .send(
            Method::PATCH,
            &format!("/users-update/{me}"),
            Some(&me),
            Some(json!({ "city": "Dhaka", "phone": "01700000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Dhaka");
    assert_eq!(body["role"], "user");

    let (status, _) = client
        .send(
            Method::PATCH,
            &format!("/users-update/{me}"),
            Some(&me),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert!(status.is_client_error());
    let user = test.store.find_user_by_email(&me).await.unwrap().unwrap();
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn bookings_are_visible_only_to_their_owner() {
    let test = test_app();
    let client = Client::new(&test);
    let buyer = random_email();
    let snooper = random_email();
    let ticket = seed_ticket(test.store.as_ref(), &random_email(), 5).await;
    seed_booking(test.store.as_ref(), &ticket, &buyer, 2).await;

    let uri = format!("/my-bookings?email={buyer}");
    let (status, _) = client.get(&uri, Some(&snooper)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client.get(&uri, Some(&buyer)).await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body.as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["ticket"]["id"], ticket.id.to_string());
}

#[tokio::test]
async fn booking_respects_inventory_and_moderation() {
    let test = test_app();
    let client = Client::new(&test);
    let buyer = random_email();
    let ticket = seed_ticket(test.store.as_ref(), &random_email(), 2).await;

    let (status, body) = client
        .send(
            Method::POST,
            "/bookings",
            Some(&buyer),
            Some(json!({ "ticketId": ticket.id, "quantity": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough seats available!");

    let (status, body) = client
        .send(
            Method::POST,
            "/bookings",
            Some(&buyer),
            Some(json!({ "ticketId": ticket.id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Booking successful");
    assert_eq!(body["booking"]["status"], "unpaid");
    assert_eq!(body["booking"]["totalPrice"], 3000);

    test.store
        .set_ticket_status(ticket.id, TicketStatus::Rejected)
        .await
        .unwrap();
    let (status, _) = client
        .send(
            Method::POST,
            "/bookings",
            Some(&buyer),
            Some(json!({ "ticketId": ticket.id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vendor_decides_but_cannot_touch_paid_bookings() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;
    let ticket = seed_ticket(test.store.as_ref(), &vendor, 5).await;
    let booking = seed_booking(test.store.as_ref(), &ticket, &random_email(), 1).await;
    let uri = format!("/bookings/{}", booking.id);

    let (status, body) = client
        .send(Method::PATCH, &uri, Some(&vendor), Some(json!({ "status": "accepted" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&vendor), Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stranger = random_email();
    seed_user(test.store.as_ref(), &stranger, Role::Vendor).await;
    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&stranger), Some(json!({ "status": "rejected" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    test.store
        .mark_booking_paid(booking.id, "cs_done", "TCK-1-ABCDEF")
        .await
        .unwrap();
    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&vendor), Some(json!({ "status": "rejected" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn checkout_then_confirm_end_to_end() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;
    let buyer = random_email();
    let ticket = seed_ticket(test.store.as_ref(), &vendor, 10).await;
    let booking = seed_booking(test.store.as_ref(), &ticket, &buyer, 2).await;

    let (status, _) = client
        .send(
            Method::POST,
            "/create-checkout-session",
            Some(&random_email()),
            Some(json!({ "bookingId": booking.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client
        .send(
            Method::POST,
            "/create-checkout-session",
            Some(&buyer),
            Some(json!({ "bookingId": booking.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().starts_with("https://checkout.test/"));
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let opened = test.gateway.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].amount, 3000);
    assert_eq!(opened[0].quantity, 2);

    let uri = format!("/payment-success?session_id={session_id}");
    let (status, body) = client.send(Method::PATCH, &uri, Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["paymentStatus"], "unpaid");

    test.gateway.pay(&session_id);
    let (status, body) = client.send(Method::PATCH, &uri, Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["ticket"]["quantity"], 8);
    let tracking_id = body["trackingId"].as_str().unwrap().to_string();

    let (_, body) = client.send(Method::PATCH, &uri, Some(&buyer), None).await;
    assert_eq!(body["message"], "Already paid");
    assert_eq!(body["trackingId"], tracking_id.as_str());

    let (status, body) = client
        .get(&format!("/payment-transaction?email={buyer}"), Some(&buyer))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["transactionId"], format!("pi_{session_id}"));

    let (status, body) = client
        .get(&format!("/vendor/revenue-stats?email={vendor}"), Some(&vendor))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["revenue"], 3000);
    assert_eq!(body[0]["sold"], 2);
    assert_eq!(body[0]["added"], 1);

    let (status, _) = client
        .send(
            Method::POST,
            "/create-checkout-session",
            Some(&buyer),
            Some(json!({ "bookingId": booking.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signed_webhook_confirms_payment() {
    let test = test_app();
    let client = Client::new(&test);
    let ticket = seed_ticket(test.store.as_ref(), &random_email(), 4).await;
    let booking = seed_booking(test.store.as_ref(), &ticket, &random_email(), 1).await;
    let session_id = test.gateway.paid_session(&booking);

    let payload = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id } },
    })
    .to_string();
    let now = chrono::Utc::now().timestamp();

    let forged = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/payment")
        .header(webhook::SIGNATURE_HEADER, webhook::sign(payload.as_bytes(), "whsec_wrong", now))
        .body(Body::from(payload.clone()))
        .unwrap();
    let response = client.app.clone().oneshot(forged).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let signed = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/payment")
        .header(webhook::SIGNATURE_HEADER, webhook::sign(payload.as_bytes(), WEBHOOK_SECRET, now))
        .body(Body::from(payload))
        .unwrap();
    let response = client.app.clone().oneshot(signed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let booking = test.store.find_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Paid);
    assert_eq!(test.store.find_ticket(ticket.id).await.unwrap().unwrap().quantity, 3);
}

#[tokio::test]
async fn public_catalog_shows_only_approved_stock() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    let approved = seed_ticket(test.store.as_ref(), &vendor, 3).await;
    let sold_out = seed_ticket(test.store.as_ref(), &vendor, 1).await;
    test.store.decrement_ticket_quantity(sold_out.id, 1).await.unwrap();
    let pending = seed_ticket(test.store.as_ref(), &vendor, 3).await;
    test.store
        .set_ticket_status(pending.id, TicketStatus::Pending)
        .await
        .unwrap();

    let response = client
        .app
        .clone()
        .oneshot(Request::get("/all-tickets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache"], "MISS");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(ids, vec![approved.id.to_string().as_str()]);
}

#[tokio::test]
async fn listing_price_is_capped() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;

    let ticket = json!({
        "title": "Dhaka to Sylhet",
        "fromLocation": "Dhaka",
        "toLocation": "Sylhet",
        "transportType": "train",
        "price": 100_000_001i64,
        "quantity": 40,
    });
    let (status, body) = client
        .send(Method::POST, "/tickets", Some(&vendor), Some(ticket))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(test
        .store
        .list_tickets(TicketFilter::OwnedBy(&vendor))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn vendor_sees_only_their_own_booking_requests() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;
    let mine = seed_ticket(test.store.as_ref(), &vendor, 5).await;
    let theirs = seed_ticket(test.store.as_ref(), &random_email(), 5).await;
    let booking = seed_booking(test.store.as_ref(), &mine, &random_email(), 1).await;
    seed_booking(test.store.as_ref(), &theirs, &random_email(), 1).await;
    let uri = format!("/vendor/bookings-request?vendorEmail={vendor}");

    let (status, body) = client.get(&uri, Some(&vendor)).await;
    assert_eq!(status, StatusCode::OK);
    let requests = body.as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["id"], booking.id.to_string());

    // Another vendor cannot read this vendor's queue.
    let rival = random_email();
    seed_user(test.store.as_ref(), &rival, Role::Vendor).await;
    let (status, _) = client.get(&uri, Some(&rival)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Asking about yourself still needs the vendor role.
    let buyer = random_email();
    seed_user(test.store.as_ref(), &buyer, Role::User).await;
    let (status, _) = client
        .get(&format!("/vendor/bookings-request?vendorEmail={buyer}"), Some(&buyer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn my_tickets_is_scoped_to_the_calling_vendor() {
    let test = test_app();
    let client = Client::new(&test);
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;
    let listed = seed_ticket(test.store.as_ref(), &vendor, 5).await;
    seed_ticket(test.store.as_ref(), &random_email(), 5).await;
    let uri = format!("/my-tickets?email={vendor}");

    let (status, body) = client.get(&uri, Some(&vendor)).await;
    assert_eq!(status, StatusCode::OK);
    let tickets = body.as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["id"], listed.id.to_string());

    let other = random_email();
    seed_user(test.store.as_ref(), &other, Role::Vendor).await;
    let (status, _) = client.get(&uri, Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let buyer = random_email();
    seed_user(test.store.as_ref(), &buyer, Role::User).await;
    let (status, _) = client
        .get(&format!("/my-tickets?email={buyer}"), Some(&buyer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_advertises_ticket_on_public_listing() {
    let test = test_app();
    let client = Client::new(&test);
    let admin = random_email();
    seed_user(test.store.as_ref(), &admin, Role::Admin).await;
    let vendor = random_email();
    seed_user(test.store.as_ref(), &vendor, Role::Vendor).await;
    let ticket = seed_ticket(test.store.as_ref(), &vendor, 5).await;
    let uri = format!("/tickets/advertise/{}", ticket.id);

    let (_, body) = client.get("/tickets-advertise", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = client
        .send(Method::PATCH, &uri, Some(&vendor), Some(json!({ "isAdvertised": true })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({ "isAdvertised": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdvertised"], true);

    let (status, body) = client.get("/tickets-advertise", None).await;
    assert_eq!(status, StatusCode::OK);
    let advertised = body.as_array().unwrap();
    assert_eq!(advertised.len(), 1);
    assert_eq!(advertised[0]["id"], ticket.id.to_string());

    let missing = format!("/tickets/advertise/{}", uuid::Uuid::new_v4());
    let (status, _) = client
        .send(Method::PATCH, &missing, Some(&admin), Some(json!({ "isAdvertised": true })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_history_is_private() {
    let test = test_app();
    let client = Client::new(&test);
    let buyer = random_email();
    let snooper = random_email();

    let (status, body) = client
        .get(&format!("/payment-transaction?email={buyer}"), Some(&snooper))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = client
        .get(&format!("/payment-transaction?email={buyer}"), Some(&buyer))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_search_ignores_case() {
    let test = test_app();
    let client = Client::new(&test);
    let admin = random_email();
    seed_user(test.store.as_ref(), &admin, Role::Admin).await;
    seed_user(test.store.as_ref(), "rahim@x.com", Role::Vendor).await;
    seed_user(test.store.as_ref(), &random_email(), Role::User).await;

    let (status, body) = client.get("/users?search=RAHIM", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "rahim@x.com");

    let (status, _) = client.get("/users?search=RAHIM", Some("rahim@x.com")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    seed_ticket(test.store.as_ref(), &random_email(), 5).await;
    let night_coach = json!({
        "title": "Sylhet Night Coach",
        "fromLocation": "Dhaka",
        "toLocation": "Sylhet",
        "transportType": "bus",
        "price": 900,
        "quantity": 30,
    });
    let (status, created) = client
        .send(Method::POST, "/tickets", Some("rahim@x.com"), Some(night_coach))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = client
        .get("/tickets?search=sylhet%20NIGHT", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let tickets = body.as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["id"], created["ticket"]["id"]);

    let (_, body) = client.get("/tickets", Some(&admin)).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

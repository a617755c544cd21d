//! Host↔wallet request round trips over the loopback transport.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use common::{Fixture, WALLET_ORIGIN, WALLET_URL, wait_until, within};
use wallet_bridge::transport::{Element, LoopbackWindow, SANDBOX_PERMISSIONS};
use wallet_bridge::{BrowsingContext, ChannelState, Error, TransportMode, WalletClient};

#[tokio::test]
async fn test_frame_channel_handshake_and_items() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    assert_eq!(client.state(), ChannelState::Ready);
    assert_eq!(client.mode(), Some(TransportMode::Frame));
    assert_eq!(client.target_origin(), WALLET_ORIGIN);

    assert_eq!(within(client.items()).await.expect("items"), json!([]));
    assert_eq!(client.pending_count(), 0);

    let container = fixture.host.element("wallet").expect("container");
    let children = container.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag_name(), "iframe");
    assert_eq!(children[0].attribute("src").as_deref(), Some(WALLET_URL));
    assert_eq!(
        children[0].attribute("sandbox"),
        Some(SANDBOX_PERMISSIONS.join(" "))
    );
}

#[tokio::test]
async fn test_request_ids_are_sequential() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let frame = fixture.host.element("wallet").expect("container").children()[0].clone();
    let wallet_window = frame.content_window().expect("loaded");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    wallet_window.surface().add_listener(move |event| {
        if let Some(id) = event.data.get("requestId").and_then(Value::as_str) {
            record.lock().push(id.to_string());
        }
    });

    within(client.items()).await.expect("items");
    within(client.current_path()).await.expect("path");

    assert_eq!(*seen.lock(), vec!["action-1", "action-2"]);
}

#[tokio::test]
async fn test_popup_channel() {
    let fixture = Fixture::new();
    let client = WalletClient::builder()
        .wallet_app_url(WALLET_URL)
        .dark_mode(true)
        .marketplace_id("iq__market")
        .marketplace_hash("hq__v1")
        .popup(&*fixture.host)
        .await
        .expect("popup channel");

    assert_eq!(client.mode(), Some(TransportMode::Popup));

    let popups = fixture.host.popups();
    assert_eq!(popups.len(), 1);
    assert_eq!(
        popups[0].url.as_str(),
        "https://wallet.example/app?dark=true&mid=iq__market&mhash=hq__v1"
    );
    assert_eq!(popups[0].name, "_blank");
    assert!(popups[0].features.starts_with("scrollbars=yes,width=500,height=850"));

    let profile = within(client.user_profile()).await.expect("profile");
    assert_eq!(profile["address"], "0xabc");

    client.destroy();
    assert!(popups[0].window.is_closed());
}

#[tokio::test]
async fn test_concurrent_requests_do_not_interfere() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let (items, path, item, profile) = within(async {
        futures_util::join!(
            client.items(),
            client.current_path(),
            client.item("0xcontract", "7"),
            client.user_profile(),
        )
    })
    .await;

    assert_eq!(items.expect("items"), json!([]));
    assert_eq!(path.expect("path"), "/items");
    assert_eq!(
        item.expect("item"),
        json!({ "contractAddress": "0xcontract", "tokenId": "7" })
    );
    assert_eq!(profile.expect("profile")["address"], "0xabc");
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_navigate_forms() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let page = within(client.navigate("item", Some(json!({ "sku": "abc" }))))
        .await
        .expect("navigate");
    assert_eq!(page, json!({ "page": "item", "params": { "sku": "abc" } }));

    let path = within(client.navigate_path("/wallet/profile"))
        .await
        .expect("navigate path");
    assert_eq!(path, json!({ "path": "/wallet/profile" }));
}

#[tokio::test]
async fn test_unknown_action_rejected_by_wallet() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let err = within(client.request("teleport", json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Remote { .. }));
    assert!(err.to_string().contains("teleport"));
    assert_eq!(client.state(), ChannelState::Ready);
}

#[tokio::test]
async fn test_unimplemented_action_rejected() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let err = within(client.listings(None, None)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Wallet error: Unsupported action: listings"
    );
}

#[tokio::test]
async fn test_fire_and_forget_returns_immediately() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    client.set_dark_mode(true).await.expect("posted");
    assert_eq!(client.pending_count(), 0);

    wait_until(|| fixture.calls().contains(&"setDarkMode:true".to_string())).await;
}

#[tokio::test]
async fn test_unrelated_messages_are_inert() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let evil = LoopbackWindow::new("https://evil.example");
    let stranger = fixture.host.window().proxy(&evil);
    for junk in [
        json!("hello"),
        json!({ "type": "SomethingElse", "requestId": "action-1" }),
        json!({ "type": "WalletClientResponse", "requestId": "action-99", "response": 1 }),
        json!({ "type": "WalletClientResponse", "requestId": "action-1", "response": "forged" }),
        json!({ "type": "WalletEvent", "event": "sneeze" }),
        json!({ "type": "WalletEvent", "event": "close" }),
    ] {
        stranger.post_message(junk, "*").expect("post");
    }

    assert_eq!(within(client.items()).await.expect("items"), json!([]));
    assert_eq!(client.state(), ChannelState::Ready);
}

#[tokio::test]
async fn test_client_price_validation() {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let err = client.list_item("0xc", "1", -3.0, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));

    let err = client.purchase("iq__m", "sku", 0).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_missing_target_element() {
    let fixture = Fixture::new();

    let err = WalletClient::builder()
        .wallet_app_url(WALLET_URL)
        .target_id("nowhere")
        .frame(&*fixture.host)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidTarget { .. }));
    assert!(fixture.listeners.lock().is_empty());
}

#[tokio::test]
async fn test_frame_mode_requires_target() {
    let fixture = Fixture::new();

    let err = WalletClient::builder()
        .wallet_app_url(WALLET_URL)
        .frame(&*fixture.host)
        .await
        .unwrap_err();

    assert!(err.is_config_error());
}

#[tokio::test]
async fn test_existing_iframe_element_target() {
    let fixture = Fixture::new();
    let iframe = fixture.host.add_element("wallet-frame", "iframe");

    let client = WalletClient::builder()
        .wallet_app_url(WALLET_URL)
        .target(iframe.clone())
        .frame(&*fixture.host)
        .await
        .expect("frame channel");

    assert_eq!(within(client.items()).await.expect("items"), json!([]));
    assert_eq!(iframe.attribute("src").as_deref(), Some(WALLET_URL));
    assert!(iframe.content_window().is_some());
}

#[tokio::test]
async fn test_item_and_profile_lookup() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let client = fixture.frame().await;

    let item = within(client.item("0xcontract", "42")).await?;
    assert_eq!(item["contractAddress"], "0xcontract");
    assert_eq!(item["tokenId"], "42");

    let profile = within(client.user_profile()).await?;
    assert_eq!(profile["address"], "0xabc");

    assert_eq!(within(client.current_path()).await?, "/items");
    assert_eq!(fixture.calls(), vec!["item"]);
    Ok(())
}

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bookcover::controller::controller::RegionController;
use bookcover::controller::filter::{FilterOutcome, UnitVerdict, classify_unit};
use bookcover::dom::dom_model::Document;
use bookcover::dom::host_page::HostPage;
use bookcover::locator::locator::{ElementLocator, LocatorSettings};
use bookcover::registry::registry::SelectorRegistry;
use bookcover::registry::registry_model::RegionName;
use tokio::time::Instant;

use crate::common::{first, full_page};

mod common;

// ============================================================================
// Helpers
// ============================================================================

fn controller_on(page: &HostPage, initialized: bool) -> RegionController {
    let registry = Arc::new(SelectorRegistry::with_defaults());
    let locator = Arc::new(ElementLocator::new(
        page.clone(),
        registry.clone(),
        LocatorSettings {
            poll_interval: Duration::from_millis(100),
            default_timeout: Duration::from_millis(500),
        },
    ));
    if initialized {
        locator.mark_initialized();
    }
    RegionController::new(page.clone(), locator, registry)
}

fn words(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|w| w.to_string()).collect()
}

// ============================================================================
// hide / show / is_hidden
// ============================================================================

#[tokio::test(start_paused = true)]
async fn hide_is_idempotent() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    assert!(controller.hide(&RegionName::Reels).await.unwrap());
    assert!(controller.is_hidden(&RegionName::Reels));

    assert!(controller.hide(&RegionName::Reels).await.unwrap());
    assert!(controller.is_hidden(&RegionName::Reels));

    let doc = page.read();
    let reels = first(&doc, r#"div[aria-label="Reels"]"#);
    assert_eq!(doc.display(reels), Some("none"));
}

#[tokio::test(start_paused = true)]
async fn hide_touches_only_its_region() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    controller.hide(&RegionName::Stories).await.unwrap();

    assert!(controller.is_hidden(&RegionName::Stories));
    assert!(!controller.is_hidden(&RegionName::Reels));
    assert!(!controller.is_hidden(&RegionName::Feed));
}

#[tokio::test(start_paused = true)]
async fn show_restores_visibility() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    controller.hide(&RegionName::Reels).await.unwrap();
    assert!(controller.show(&RegionName::Reels).await.unwrap());

    assert!(!controller.is_hidden(&RegionName::Reels));
    let doc = page.read();
    assert_eq!(doc.display(first(&doc, r#"div[aria-label="Reels"]"#)), None);
}

#[tokio::test(start_paused = true)]
async fn hide_absent_region_reports_not_found_after_timeout() {
    let page = HostPage::new(Document::new());
    let controller = controller_on(&page, true);

    let started = Instant::now();
    assert!(!controller.hide(&RegionName::Reels).await.unwrap());
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(!controller.is_hidden(&RegionName::Reels));
}

#[tokio::test]
async fn show_absent_region_returns_immediately() {
    let page = HostPage::new(Document::new());
    let controller = controller_on(&page, true);
    assert!(!controller.show(&RegionName::Stories).await.unwrap());
}

#[tokio::test]
async fn is_hidden_never_fails() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, false);

    assert!(!controller.is_hidden(&RegionName::Reels));
    assert!(!controller.is_hidden(&RegionName::from("nowhere")));
}

#[tokio::test]
async fn hide_before_initialize_is_an_error() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, false);

    let err = controller.hide(&RegionName::Reels).await.unwrap_err();
    assert!(err.is_uninitialized());
}

#[tokio::test(start_paused = true)]
async fn hide_reaches_region_rendered_late() {
    let page = HostPage::new(Document::new());
    let controller = controller_on(&page, true);

    let renderer = page.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        renderer.mutate(|doc| {
            let reels = doc.append_element(doc.root(), "div");
            doc.set_attribute(reels, "aria-label", "Reels");
        });
    });

    assert!(controller.hide(&RegionName::Reels).await.unwrap());
    assert!(controller.is_hidden(&RegionName::Reels));
}

// ============================================================================
// filter
// ============================================================================

#[tokio::test(start_paused = true)]
async fn feed_filter_keeps_close_contacts_only() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    let outcome = controller.filter(&RegionName::Feed).await.unwrap();
    assert_eq!(outcome, Some(FilterOutcome { kept: 1, hidden: 1 }));

    let doc = page.read();
    let feed = first(&doc, r#"[role="feed"]"#);
    let units = doc.element_children(feed);
    assert_eq!(doc.text_content(units[0]), "Friend post");
    assert_eq!(doc.display(units[0]), None);
    assert_eq!(doc.text_content(units[1]), "Suggested for you");
    assert!(doc.is_display_none(units[1]));
    assert_eq!(doc.display(feed), None);
}

#[tokio::test(start_paused = true)]
async fn filter_unhides_a_hidden_feed() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    controller.hide(&RegionName::Feed).await.unwrap();
    controller.filter(&RegionName::Feed).await.unwrap();

    let doc = page.read();
    assert_eq!(doc.display(first(&doc, r#"[role="feed"]"#)), None);
}

#[tokio::test(start_paused = true)]
async fn show_clears_filtered_units() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    controller.filter(&RegionName::Feed).await.unwrap();
    controller.show(&RegionName::Feed).await.unwrap();

    let doc = page.read();
    let feed = first(&doc, r#"[role="feed"]"#);
    assert!(doc.element_children(feed).iter().all(|u| doc.display(*u).is_none()));
}

#[tokio::test(start_paused = true)]
async fn filter_other_regions_is_a_no_op() {
    let page = HostPage::new(full_page());
    let controller = controller_on(&page, true);

    assert_eq!(controller.filter(&RegionName::Reels).await.unwrap(), None);
    assert!(!controller.is_hidden(&RegionName::Reels));
}

#[tokio::test(start_paused = true)]
async fn filter_absent_feed_is_none() {
    let page = HostPage::new(Document::new());
    let controller = controller_on(&page, true);
    assert_eq!(controller.filter(&RegionName::Feed).await.unwrap(), None);
}

// ============================================================================
// classify_unit
// ============================================================================

#[test]
fn unit_rules() {
    let close = words(&["friend", "family"]);
    let suggested = words(&["suggested", "sponsored"]);

    assert_eq!(classify_unit("Friend post", &close, &suggested), UnitVerdict::Keep);
    assert_eq!(classify_unit("FAMILY dinner", &close, &suggested), UnitVerdict::Keep);
    assert_eq!(classify_unit("Suggested for you", &close, &suggested), UnitVerdict::Hide);
    // a close contact's sponsored post is still an ad
    assert_eq!(
        classify_unit("Your friend likes this · Sponsored", &close, &suggested),
        UnitVerdict::Hide
    );
    assert_eq!(classify_unit("Random page", &close, &suggested), UnitVerdict::Hide);
    assert_eq!(classify_unit("", &close, &suggested), UnitVerdict::Hide);
}

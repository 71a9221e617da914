use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bookcover::dom::dom_model::Document;
use bookcover::dom::host_page::HostPage;
use bookcover::observer::observer::{ChangeObserver, ObserverSettings};
use parking_lot::Mutex;
use tokio::time::sleep;

// ============================================================================
// Helpers
// ============================================================================

const DEBOUNCE: Duration = Duration::from_millis(1000);

fn counting_observer(page: &HostPage) -> (ChangeObserver, Arc<AtomicUsize>) {
    let observer = ChangeObserver::new(ObserverSettings::default());
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    observer.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    observer.connect(page);
    (observer, count)
}

fn add_div(page: &HostPage) {
    page.mutate(|doc| {
        doc.append_element(doc.root(), "div");
    });
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_mutations_yields_one_tick() {
    let page = HostPage::new(Document::new());
    let (observer, count) = counting_observer(&page);

    for _ in 0..10 {
        add_div(&page);
        sleep(ms(50)).await;
    }
    sleep(DEBOUNCE * 2).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(observer.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn tick_fires_on_trailing_edge() {
    let page = HostPage::new(Document::new());
    let (_observer, count) = counting_observer(&page);

    add_div(&page); // t = 0
    sleep(ms(600)).await;
    add_div(&page); // t = 600, window now ends at 1600
    sleep(ms(600)).await;
    add_div(&page); // t = 1200, window now ends at 2200

    sleep(ms(900)).await; // t = 2100
    assert_eq!(count.load(Ordering::SeqCst), 0);

    sleep(ms(200)).await; // t = 2300
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn separated_bursts_yield_separate_ticks() {
    let page = HostPage::new(Document::new());
    let (_observer, count) = counting_observer(&page);

    add_div(&page);
    sleep(DEBOUNCE + ms(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    add_div(&page);
    sleep(DEBOUNCE + ms(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn no_mutations_no_ticks() {
    let page = HostPage::new(Document::new());
    let (_observer, count) = counting_observer(&page);

    sleep(DEBOUNCE * 5).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Relevance filter
// ============================================================================

#[tokio::test(start_paused = true)]
async fn style_and_text_changes_are_ignored() {
    let mut doc = Document::new();
    let div = doc.append_element(doc.root(), "div");
    doc.take_records();
    let page = HostPage::new(doc);
    let (_observer, count) = counting_observer(&page);

    page.mutate(|doc| doc.set_display(div, Some("none")));
    page.mutate(|doc| doc.set_text(div, "hello"));
    page.mutate(|doc| doc.set_attribute(div, "data-testid", "x"));
    sleep(DEBOUNCE * 2).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    page.mutate(|doc| doc.set_attribute(div, "aria-label", "Reels"));
    sleep(DEBOUNCE * 2).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn ignored_mutations_do_not_extend_the_window() {
    let mut doc = Document::new();
    let div = doc.append_element(doc.root(), "div");
    doc.take_records();
    let page = HostPage::new(doc);
    let (_observer, count) = counting_observer(&page);

    page.mutate(|doc| doc.set_attribute(div, "class", "a"));
    sleep(ms(800)).await;
    page.mutate(|doc| doc.set_display(div, Some("none")));
    sleep(ms(300)).await; // t = 1100

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Subscribers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn subscribers_run_in_subscription_order() {
    let page = HostPage::new(Document::new());
    let observer = ChangeObserver::new(ObserverSettings::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["scan", "reapply", "refresh"] {
        let order = order.clone();
        observer.subscribe(move || order.lock().push(name));
    }
    observer.connect(&page);

    add_div(&page);
    sleep(DEBOUNCE * 2).await;

    assert_eq!(*order.lock(), vec!["scan", "reapply", "refresh"]);
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_callback_stops_running() {
    let page = HostPage::new(Document::new());
    let observer = ChangeObserver::new(ObserverSettings::default());
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let id = observer.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    observer.connect(&page);

    assert!(observer.unsubscribe(id));
    assert!(!observer.unsubscribe(id));

    add_div(&page);
    sleep(DEBOUNCE * 2).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(observer.tick_count(), 1);
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_window() {
    let page = HostPage::new(Document::new());
    let (observer, count) = counting_observer(&page);

    add_div(&page);
    sleep(ms(500)).await;
    observer.disconnect();

    add_div(&page);
    sleep(DEBOUNCE * 2).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(!observer.is_connected());
    assert_eq!(observer.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent() {
    let page = HostPage::new(Document::new());
    let (observer, _count) = counting_observer(&page);

    observer.disconnect();
    observer.disconnect();
    assert!(!observer.is_connected());
}

#[tokio::test(start_paused = true)]
async fn disconnect_from_inside_a_callback() {
    let page = HostPage::new(Document::new());
    let observer = Arc::new(ChangeObserver::new(ObserverSettings::default()));
    let later = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&observer);
    observer.subscribe(move || {
        if let Some(observer) = weak.upgrade() {
            observer.disconnect();
        }
    });
    let seen = later.clone();
    observer.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    observer.connect(&page);

    add_div(&page);
    sleep(DEBOUNCE * 2).await;

    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert!(!observer.is_connected());
}

#[tokio::test(start_paused = true)]
async fn second_connect_is_a_no_op() {
    let page = HostPage::new(Document::new());
    let (observer, count) = counting_observer(&page);
    observer.connect(&page);

    add_div(&page);
    sleep(DEBOUNCE * 2).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn custom_debounce_is_honoured() {
    let page = HostPage::new(Document::new());
    let observer = ChangeObserver::new(ObserverSettings {
        debounce: ms(200),
        ..ObserverSettings::default()
    });
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    observer.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    observer.connect(&page);

    add_div(&page);
    sleep(ms(250)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

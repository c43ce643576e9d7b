//! Reply pacing, on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use balcao::bot::replies;

mod common;

use common::{Harness, Sent};

const MARIA: &str = "5511988887777@c.us";
const TYPING: Duration = Duration::from_millis(1500);
const BULK: Duration = Duration::from_millis(2000);

/// Paused time lands exactly on deadlines; allow for millisecond rounding.
fn assert_took(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "took {elapsed:?}, expected {expected:?}"
    );
}

async fn advance_to(start: Instant, at: Duration) {
    tokio::time::sleep_until(start + at).await;
}

#[tokio::test(start_paused = true)]
async fn typing_shows_before_the_pause_then_text() {
    let harness = Arc::new(Harness::paced(&[], TYPING, BULK));
    let start = Instant::now();

    let task = tokio::spawn({
        let harness = harness.clone();
        async move { harness.say(MARIA, "oi").await }
    });

    advance_to(start, Duration::from_millis(1000)).await;
    assert_eq!(harness.transport.sent(), vec![Sent::Typing(MARIA.to_string())]);

    task.await.unwrap();
    assert_took(start.elapsed(), TYPING);
    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[1], Sent::Text(chat, _) if chat == MARIA));
}

#[tokio::test(start_paused = true)]
async fn each_reply_in_a_message_is_paced() {
    let harness = Harness::paced(&["a.pdf", "b.pdf"], TYPING, BULK);
    harness.say(MARIA, "oi").await;
    harness.say(MARIA, "6").await;
    harness.transport.clear();

    let start = Instant::now();
    harness.say(MARIA, "1").await;

    // "processing", the document right away, "returning", menu
    assert_took(start.elapsed(), TYPING * 3);
    assert_eq!(harness.transport.documents(MARIA), vec!["a.pdf"]);
}

#[tokio::test(start_paused = true)]
async fn send_all_delivers_one_document_per_interval() {
    let harness = Arc::new(Harness::paced(&["a.pdf", "b.pdf", "c.pdf"], TYPING, BULK));
    harness.say(MARIA, "oi").await;
    harness.say(MARIA, "6").await;
    harness.transport.clear();

    let start = Instant::now();
    let task = tokio::spawn({
        let harness = harness.clone();
        async move { harness.say(MARIA, "0").await }
    });

    // "sending all" goes out at 1.5s, documents at 1.5s, 3.5s and 5.5s
    advance_to(start, Duration::from_millis(1000)).await;
    assert!(harness.transport.documents(MARIA).is_empty());
    assert_eq!(harness.transport.texts(MARIA), Vec::<String>::new());

    advance_to(start, Duration::from_millis(2500)).await;
    assert_eq!(harness.transport.documents(MARIA), vec!["a.pdf"]);
    assert_eq!(harness.transport.texts(MARIA), vec![replies::SENDING_ALL]);

    advance_to(start, Duration::from_millis(4500)).await;
    assert_eq!(harness.transport.documents(MARIA), vec!["a.pdf", "b.pdf"]);

    advance_to(start, Duration::from_millis(6500)).await;
    assert_eq!(
        harness.transport.documents(MARIA),
        vec!["a.pdf", "b.pdf", "c.pdf"]
    );
    assert_eq!(harness.transport.texts(MARIA).len(), 1);

    task.await.unwrap();
    // Three paced texts plus one pause per document
    assert_took(start.elapsed(), TYPING * 3 + BULK * 3);
    let texts = harness.transport.texts(MARIA);
    assert_eq!(texts[1], replies::ALL_SENT);
    assert!(texts[2].starts_with("Bom dia"));
}

#[tokio::test(start_paused = true)]
async fn sweeper_notices_are_not_paced() {
    let harness = Harness::paced(&[], TYPING, BULK);
    harness.say(MARIA, "oi").await;
    harness.transport.clear();
    harness.clock.advance(chrono::TimeDelta::minutes(4));

    let start = Instant::now();
    let report = harness.sweeper().sweep().await;

    assert_eq!(report.warned, 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(harness.transport.texts(MARIA), vec![replies::IDLE_WARNING]);
}

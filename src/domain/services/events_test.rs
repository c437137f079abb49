use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;

use super::EventsService;
use crate::domain::models::Event;

#[tokio::test]
async fn it_reads_lines_then_closes_input() -> Result<()> {
    let (_tx, rx) = mpsc::unbounded_channel::<Event>();
    let input: &'static [u8] = b"a web app\n/sessions\n";
    let mut events = EventsService::with_input(Box::new(input), rx);

    match events.next().await? {
        Event::UserInput(text) => assert_eq!(text, "a web app"),
        event => bail!("Unexpected event {event:?}"),
    }
    match events.next().await? {
        Event::UserInput(text) => assert_eq!(text, "/sessions"),
        event => bail!("Unexpected event {event:?}"),
    }
    assert!(matches!(events.next().await?, Event::InputClosed()));

    return Ok(());
}

#[tokio::test]
async fn it_forwards_backend_events() -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let input: &'static [u8] = b"";
    let mut events = EventsService::with_input(Box::new(input), rx);

    assert!(matches!(events.next().await?, Event::InputClosed()));

    tx.send(Event::BackendWaiting(true))?;
    assert!(matches!(events.next().await?, Event::BackendWaiting(true)));

    return Ok(());
}

#[tokio::test]
async fn it_stops_polling_closed_sources() -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let input: &'static [u8] = b"";
    let mut events = EventsService::with_input(Box::new(input), rx);

    assert!(matches!(events.next().await?, Event::InputClosed()));
    tx.send(Event::BackendWaiting(false))?;
    drop(tx);
    assert!(matches!(events.next().await?, Event::BackendWaiting(false)));

    let res = tokio::time::timeout(Duration::from_millis(100), events.next()).await;
    assert!(res.is_err());
    assert!(!events.input_open);
    assert!(!events.events_open);

    return Ok(());
}

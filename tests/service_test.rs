//! Service Tests - Paper Venue, Tick Feed and Audit Log End-to-end
//!
//! Drives a spawned agent service from a text feed and checks the fills,
//! the remaining book, and the persisted audit trail.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::broadcast;

use limit_order_agent::adapters::audit::EventLog;
use limit_order_agent::adapters::execution::PaperExecutor;
use limit_order_agent::adapters::execution::paper::Fill;
use limit_order_agent::adapters::feeds::LineTickFeed;
use limit_order_agent::config::PaperConfig;
use limit_order_agent::domain::order::TradeSide;
use limit_order_agent::usecases::{AgentService, LimitOrderAgent};

#[tokio::test]
async fn test_feed_drives_agent_through_service() {
    let venue = Arc::new(PaperExecutor::from_config(&PaperConfig {
        reject_instruments: vec!["GME".to_string()],
    }));
    let mut agent = LimitOrderAgent::new(Arc::clone(&venue));
    agent.add_order(TradeSide::Buy, "IBM", 1000, 100.0).unwrap();
    agent.add_order(TradeSide::Sell, "AAPL", 500, 150.0).unwrap();
    let gme = agent.add_order(TradeSide::Buy, "GME", 10, 20.0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(EventLog::new(dir.path()).await.unwrap());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let log_task = {
        let log = Arc::clone(&log);
        let events_rx = agent.subscribe();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { log.run(events_rx, shutdown_rx).await })
    };

    let (handle, agent_task) = AgentService::spawn(agent, 16, shutdown_tx.subscribe());

    let input = "\
# warm-up
IBM 101
IBM 99
bogus line
AAPL 151
GME 19.5
IBM inf
IBM 98
";
    let feed = LineTickFeed::new(BufReader::new(input.as_bytes()), handle);
    let delivered = feed.run(shutdown_tx.subscribe()).await.unwrap();
    assert_eq!(delivered, 5);

    // Feed dropped its handle; the service drains and hands the agent back.
    let agent = agent_task.await.unwrap();
    let pending: Vec<_> = agent.pending_orders().into_iter().map(|o| o.id).collect();
    assert_eq!(pending, vec![gme]);

    assert_eq!(
        venue.fills(),
        vec![
            Fill {
                instrument_id: "IBM".to_string(),
                quantity: 1000,
                side: TradeSide::Buy,
            },
            Fill {
                instrument_id: "AAPL".to_string(),
                quantity: 500,
                side: TradeSide::Sell,
            },
        ]
    );

    // Dropping the agent drops its event sender, closing the log's stream.
    drop(agent);
    log_task.await.unwrap().unwrap();
    let records = log.load_all().await.unwrap();
    let outcomes: Vec<_> = records
        .iter()
        .map(|r| (r.event.instrument_id().to_string(), r.event.is_executed()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("IBM".to_string(), true),
            ("AAPL".to_string(), true),
            ("GME".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_feed_runs_to_eof_after_shutdown_sender_dropped() {
    let venue = Arc::new(PaperExecutor::new());
    let mut agent = LimitOrderAgent::new(Arc::clone(&venue));
    agent.add_order(TradeSide::Buy, "IBM", 10, 100.0).unwrap();

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (handle, agent_task) = AgentService::spawn(agent, 8, shutdown_tx.subscribe());
    let feed_shutdown = shutdown_tx.subscribe();
    drop(shutdown_tx);

    let feed = LineTickFeed::new(BufReader::new("IBM 101\nIBM 99\n".as_bytes()), handle);
    let delivered = feed.run(feed_shutdown).await.unwrap();
    assert_eq!(delivered, 2);

    let agent = agent_task.await.unwrap();
    assert_eq!(agent.pending_count(), 0);
    assert_eq!(venue.fills().len(), 1);
}

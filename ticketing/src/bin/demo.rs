//! Ticketing Demo
//!
//! Walks one ticket through its whole life:
//! - Issuance with a QR verification link
//! - A check at the gate (ticket stays valid)
//! - Redemption, then a second redemption that is refused
//! - A storm of simultaneous scans on a fresh ticket, admitted exactly once
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//!
//! # Retry contended scans instead of answering "busy"
//! REDEEM_LOCK_RETRIES=5 cargo run --bin demo
//! ```

use futures::future::join_all;
use std::sync::Arc;
use ticketing::{Config, IssueTicketRequest, TicketingApp};
use turnstile_core::{RedeemStatus, ScanAction, ScanCommand, ScanRequest};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🎫 ============================================");
    println!("   Ticketing - Live Demo");
    println!("============================================\n");

    let concurrent_scans = config.demo.concurrent_scans.max(1);
    let mut app = TicketingApp::new(config);
    app.install_metrics()?;
    let app = Arc::new(app);

    // Step 1: Issue a ticket
    println!("1️⃣  Issuing a ticket...");
    let issued = app
        .issue(&IssueTicketRequest::new("Alice", "a@x.com", "VIP $200", "PayPal"))
        .await?;
    println!("   ✓ Ticket: {}", issued.ticket_id);
    println!("   ✓ QR link: {}\n", issued.verification_url);

    // Step 2: Check it at the gate
    println!("2️⃣  Checking the ticket...");
    let checked = app
        .scan(ScanRequest::new(issued.verification_url.clone(), ScanCommand::Check))
        .await?;
    println!("   ✓ Status: {}\n", checked.status());

    // Step 3: Redeem it
    println!("3️⃣  Redeeming the ticket...");
    let body = serde_json::json!({ "ticketId": issued.ticket_id.as_str().to_lowercase() });
    let response = app.scan_json(&body.to_string()).await?;
    println!("   ✓ Response: {response}\n");

    // Step 4: Try again
    println!("4️⃣  Redeeming the same ticket again...");
    let again = app.scan_json(&body.to_string()).await?;
    println!("   ✓ Response: {again}\n");

    // Step 5: Scan storm
    println!("5️⃣  {concurrent_scans} scanners redeeming one fresh ticket at once...");
    let fresh = app
        .issue(&IssueTicketRequest::new("Bob", "bob@example.org", "VVIP $300", "Mobile Money"))
        .await?;

    let scans: Vec<_> = (0..concurrent_scans)
        .map(|_| {
            let app = Arc::clone(&app);
            let ticket_id = fresh.ticket_id.clone();
            tokio::spawn(async move { app.lifecycle().redeem(&ticket_id).await })
        })
        .collect();

    let mut admitted = 0;
    let mut refused = 0;
    let mut busy = 0;
    for joined in join_all(scans).await {
        match joined??.status {
            RedeemStatus::Valid => admitted += 1,
            RedeemStatus::Used => refused += 1,
            RedeemStatus::Busy => busy += 1,
            RedeemStatus::Invalid => {}
        }
    }
    println!("   ✓ Admitted: {admitted}");
    println!("   ✓ Already used: {refused}");
    println!("   ✓ Busy: {busy}");

    if let Some(ticket) = app.lifecycle().ticket(&fresh.ticket_id).await? {
        println!(
            "   ✓ History: {} redeemed, {} checked\n",
            ticket.scans_with(ScanAction::Redeemed),
            ticket.scans_with(ScanAction::Checked)
        );
    }

    // Metrics
    if let Some(metrics) = app.render_metrics() {
        println!("📈 Metrics");
        for line in metrics.lines().filter(|l| l.starts_with("turnstile_")) {
            println!("   {line}");
        }
    }

    println!("\n✅ Demo complete");
    Ok(())
}

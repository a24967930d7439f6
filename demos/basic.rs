//! # Example: basic
//!
//! Connects sync and async handlers to one signal and collects their results.
//!
//! Demonstrates how to:
//! - Define handlers with [`HandlerFn`] and [`AsyncHandlerFn`].
//! - Inspect a [`Results`] aggregate before and after joining.
//! - Let a dropped handler disappear without disconnecting it.
//! - Hand pending work to a [`Transaction`].
//!
//! ## Flow
//! ```text
//! Signal::builder() ──► connect(now), connect(later)
//!     ├─► fire(3)  ─► slot 0 ready, slot 1 pending ─► join ─► ["now 3", "later 3"]
//!     ├─► drop(now) ─► fire(4) ─► one slot
//!     └─► fire_with(tx) ─► tx.end() settles the pending slot
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic
//! ```

use std::time::Duration;

use sigvisor::{AsyncHandlerFn, FireOptions, HandlerFn, Signal, Transaction};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A named signal with sequential joining (the default)
    let changed: Signal<u32, String> = Signal::builder().name("changed").build();

    // 2. One sync and one async handler
    let now = HandlerFn::arc("now", |n: &u32| Ok(format!("now {n}")));
    let later = AsyncHandlerFn::arc("later", |n: &u32| {
        let n = *n;
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(format!("later {n}"))
        }
    });
    changed.connect(&now)?;
    changed.connect(&later)?;

    // 3. Fire: the sync slot is settled, the async one is not
    let res = changed.fire(3)?;
    println!("[fire] has_async={} done={}", res.has_async(), res.done());
    for outcome in res.join().await {
        println!("[fire] {outcome:?}");
    }

    // 4. Handlers are held weakly
    drop(now);
    let res = changed.fire(4)?;
    println!("[fire] after drop: {} slot(s)", res.len());

    // 5. Pending work goes to the transaction as well
    let tx = Transaction::begin();
    let res = changed.fire_with(5, FireOptions::default().enlist_into(tx.clone()))?;
    println!("[tx] enlisted={}", tx.len());
    tx.end().await;
    println!("[tx] done={} results={:?}", res.done(), res.results());

    Ok(())
}

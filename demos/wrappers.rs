//! # Example: wrappers
//!
//! Intercepts connect and fire, validates arguments and mirrors activity to
//! stdout through [`LogBridge`].
//!
//! Demonstrates how to:
//! - Greet every new handler with [`ConnectCtx::notify_one`].
//! - Filter fires in a fire wrapper and fall back to [`Results::ready`].
//! - Reject bad arguments with a validator.
//! - Use an asynchronous wrapper through `fire_async`.
//!
//! ## Flow
//! ```text
//! connect(h) ──► on_connect ──► proceed() ──► notify_one(0)
//! fire(n)    ──► validator  ──► on_fire   ──► n even? proceed() : Results::ready([])
//!                                   └──► LogBridge prints [fire]
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example wrappers --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use sigvisor::{Deferred, HandlerFn, LogBridge, Results, Signal};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A signal with a connect wrapper, a fire wrapper, a validator and a bridge
    let ticks = Signal::<u32, u32>::builder()
        .name("ticks")
        .bridge(Arc::new(LogBridge::new()))
        .validator(|n: &u32| {
            anyhow::ensure!(*n < 100, "tick {n} out of range");
            Ok(())
        })
        .on_connect(|ctx| {
            let added = ctx.proceed();
            if added {
                let greeting = ctx.notify_one(0);
                println!("[wrapper] greeted new handler: {:?}", greeting.results());
            }
            Deferred::ready(added)
        })
        .on_fire(|ctx| {
            if ctx.args() % 2 == 0 {
                Deferred::ready(ctx.proceed())
            } else {
                println!("[wrapper] odd tick {} skipped", ctx.args());
                Deferred::ready(Results::ready([]))
            }
        })
        .build();

    let double = HandlerFn::arc("double", |n: &u32| Ok(n * 2));
    ticks.connect(&double)?;

    // 2. Even ticks reach the handler, odd ones are answered by the wrapper
    for n in 1..=4 {
        let res = ticks.fire(n)?;
        println!("[fire] tick={n} results={:?}", res.results());
    }

    // 3. The validator runs before the wrapper
    if let Err(err) = ticks.fire(500) {
        println!("[fire] rejected: {err}");
    }

    // 4. An asynchronous fire wrapper needs the async entry point
    let slow = Signal::<u32, u32>::builder()
        .name("slow")
        .on_fire(|ctx| {
            Deferred::pending(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                ctx.proceed()
            })
        })
        .build();
    slow.connect(&double)?;

    if let Err(err) = slow.fire(1) {
        println!("[fire] sync call refused: {err}");
    }
    let res = slow.fire_async(21).await?;
    println!("[fire] async wrapper results={:?}", res.results());

    Ok(())
}

//! Select over several channels with a default and a timeout
//!
//! Three producers feed the loop at different rates from one blocking
//! thread each. A select re-arms itself after every firing:
//!
//! - `fast` / `slow` / `rare` deliver values
//! - `idle` (the default) fires when nothing is ready, and the loop
//!   counts it without doing anything else
//! - `timeout` is a channel closed by a loop timer; its firing ends the
//!   demo
//!
//! Environment:
//! - `SELECT_TIMEOUT_MS` - how long to listen (default 50)
//! - `TCH_DEBUG=1` - print the loop configuration first

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tickchan::{
    env_get, env_get_bool, kerror, spawn_blocking, ChanError, ChanResult, Channel, EventLoop, Select, Slot, WeakSelect,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Fast,
    Slow,
    Rare,
    Idle,
    Timeout,
}

struct Listener {
    ev: Rc<EventLoop>,
    inputs: Vec<(Source, Channel<u32>, Slot<u32>)>,
    timeout: Channel<()>,
    select: WeakSelect<Source>,
    idle: Cell<u64>,
}

fn main() {
    println!("=== tickchan Select ===\n");

    let timeout_ms: u64 = env_get("SELECT_TIMEOUT_MS", 50);
    let ev = match EventLoop::new() {
        Ok(ev) => Rc::new(ev),
        Err(e) => {
            kerror!("cannot create event loop: {}", e);
            std::process::exit(1);
        }
    };
    if env_get_bool("TCH_DEBUG", false) {
        ev.config().print();
    }

    let mut workers = Vec::new();
    let mut inputs = Vec::new();
    for (source, period) in [(Source::Fast, 1u64), (Source::Slow, 5), (Source::Rare, 20)] {
        let ch = Channel::new(4);
        let tx = ch.clone();
        match spawn_blocking(move || produce(tx, Duration::from_millis(period))) {
            Ok(handle) => workers.push((ch.clone(), handle)),
            Err(e) => kerror!("cannot spawn {:?} producer: {}", source, e),
        }
        inputs.push((source, ch, Slot::new()));
    }

    let timeout = Channel::new(1);
    {
        let t = timeout.clone();
        ev.add_timer(Duration::from_millis(timeout_ms), move || t.close());
    }

    let mut listener = None;
    let select = Select::new_cyclic(|me| {
        let l = Rc::new(Listener {
            ev: Rc::clone(&ev),
            inputs,
            timeout,
            select: me.clone(),
            idle: Cell::new(0),
        });
        listener = Some(Rc::clone(&l));
        move |tag, res| on_fire(&l, tag, res)
    });
    let Some(listener) = listener else { return };
    arm(&listener);

    let stats = ev.run();
    drop(select);

    for (ch, handle) in workers {
        ch.close();
        let sent = handle.join().unwrap_or(0);
        println!("[Producer] sent {}", sent);
    }
    println!("[Loop] idle firings: {}", listener.idle.get());
    println!("[Loop] {:?}", stats);
    println!("\n=== Example Complete ===");
}

fn produce(tx: Channel<u32>, period: Duration) -> u32 {
    let mut sent = 0;
    while !tx.is_closed() {
        if tx.try_push(sent).is_ok() {
            sent += 1;
        }
        std::thread::sleep(period);
    }
    sent
}

/// Register every entry and start the select
fn arm(listener: &Rc<Listener>) {
    let Some(select) = listener.select.upgrade() else { return };

    let registered: ChanResult<()> = (|| {
        for (source, ch, slot) in &listener.inputs {
            select.add_pop(*source, ch, slot)?;
        }
        select.add_pop(Source::Timeout, &listener.timeout, &Slot::new())?;
        select.add_default(Source::Idle)?;
        select.start(&*listener.ev)
    })();
    if let Err(e) = registered {
        kerror!("select not armed: {}", e);
    }
}

fn on_fire(listener: &Rc<Listener>, tag: Source, res: ChanResult<()>) {
    match (tag, res) {
        (Source::Timeout, Err(ChanError::ChannelClosed)) => {
            println!("[Loop] timeout");
            return;
        }
        (Source::Idle, _) => listener.idle.set(listener.idle.get() + 1),
        (source, Ok(())) => {
            let slot = listener.select.upgrade().and_then(|sel| sel.result_slot::<u32>());
            if let Some(value) = slot.and_then(|slot| slot.take()) {
                println!("[Loop] {:?} -> {}", source, value);
            }
        }
        (source, Err(e)) => {
            println!("[Loop] {:?} ended: {}", source, e);
            return;
        }
    }
    // Re-arm on the next tick, after this firing has fully unwound.
    let l = Rc::clone(listener);
    listener.ev.defer(move || arm(&l));
}

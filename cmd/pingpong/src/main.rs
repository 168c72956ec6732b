//! Ping-pong between the event loop and a blocking thread
//!
//! The loop pushes a ping, the worker answers with a pong, and the
//! loop's pop callback sends the next ping. After `ROUNDS` exchanges
//! the loop closes the ping channel and the worker closes the pong
//! channel on its way out.
//!
//! Environment:
//! - `PINGPONG_ROUNDS` - number of exchanges (default 5)
//! - `TCH_DEBUG=1` - print the loop configuration first

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use tickchan::{
    env_get, env_get_bool, kerror, spawn_blocking, start_pop, start_push, ChanError, Channel, EventLoop, Slot,
};

struct Game {
    ev: Rc<EventLoop>,
    pings: Channel<u64>,
    pongs: Channel<u64>,
    rounds: u64,
    done: Cell<u64>,
}

fn main() {
    println!("=== tickchan Ping-Pong ===\n");

    let rounds: u64 = env_get("PINGPONG_ROUNDS", 5);
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

    let pings = Channel::new(1);
    let pongs = Channel::new(1);

    let worker = {
        let (pings, pongs) = (pings.clone(), pongs.clone());
        spawn_blocking(move || {
            let mut answered = 0u64;
            loop {
                match pings.try_pop() {
                    Ok(n) => {
                        println!("[Worker] ping {}", n);
                        let mut reply = n;
                        while let Err(e) = pongs.try_push(reply) {
                            reply = e.into_inner();
                            std::thread::yield_now();
                        }
                        answered += 1;
                    }
                    Err(ChanError::ChannelClosed) => break,
                    Err(_) => std::thread::yield_now(),
                }
            }
            pongs.close();
            answered
        })
    };
    let worker = match worker {
        Ok(handle) => handle,
        Err(e) => {
            kerror!("cannot spawn worker: {}", e);
            std::process::exit(1);
        }
    };

    let game = Rc::new(Game {
        ev: Rc::clone(&ev),
        pings,
        pongs,
        rounds,
        done: Cell::new(0),
    });

    let start = Instant::now();
    serve(&game, 1);
    let stats = ev.run();
    let elapsed = start.elapsed();

    let answered = worker.join().unwrap_or(0);
    println!("\n[Loop] {} round(s) in {:?}, worker answered {}", game.done.get(), elapsed, answered);
    println!("[Loop] {:?}", stats);
    println!("\n=== Example Complete ===");
}

/// Send ping `n`, then wait for its pong
fn serve(game: &Rc<Game>, n: u64) {
    let g = Rc::clone(game);
    start_push(&*game.ev, &game.pings, &Slot::with(n), move |res| {
        if let Err(e) = res {
            kerror!("ping {} not sent: {}", n, e);
            return;
        }
        let reply = Slot::new();
        let got = reply.clone();
        let g2 = Rc::clone(&g);
        start_pop(&*g.ev, &g.pongs, &reply, move |res| match res {
            Ok(()) => {
                println!("[Loop]   pong {:?}", got.take());
                g2.done.set(g2.done.get() + 1);
                if n < g2.rounds {
                    serve(&g2, n + 1);
                } else {
                    g2.pings.close();
                }
            }
            Err(e) => kerror!("pong {} lost: {}", n, e),
        });
    });
}

use std::{hint::black_box, thread::spawn, time::SystemTime};

use weir::{BlockingQueue, Interrupt};

fn main() {
    let queue = BlockingQueue::new(4096).unwrap();

    let start = SystemTime::now();

    const COUNTS: usize = 10_000_000;

    let consumer = {
        let queue = queue.clone();
        spawn(move || {
            let interrupt = Interrupt::new();
            for _ in 0..COUNTS {
                let x = queue.take(&interrupt).unwrap();
                black_box(x);
            }
        })
    };

    let interrupt = Interrupt::new();
    for i in 0..COUNTS {
        queue.put(black_box(i), &interrupt).unwrap();
    }
    consumer.join().unwrap();

    let time = start.elapsed().unwrap();
    println!("{time:?}");
}

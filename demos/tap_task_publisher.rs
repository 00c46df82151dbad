/**
 * Taps an `Observable` fed by a `Tokio` channel. The receiving task only pulls from the
 * channel while there is demand, and the tap reports the values and the cancel issued
 * from `main` while the producer is still sending.
 */
use rxtap::{subscribe::Subscriber, Observable, ObservableExt, Subscribeable};

use tokio::{sync::mpsc::channel, task, time};

#[tokio::main()]
async fn main() {
    let (tx, rx) = channel(10);

    // Producer emitting a value every 10 milliseconds.
    task::spawn(async move {
        for i in 0..=1000 {
            if tx.send(i).await.is_err() {
                println!("Receiver dropped, producer stops at {}", i);
                break;
            }
            time::sleep(time::Duration::from_millis(10)).await;
        }
    });

    let subscription = Observable::<u32>::from_receiver(rx)
        .on_value(|v| println!("[tap] about to deliver {}", v))
        .map(|v| format!("Mapped {}", v))
        .on_cancel(|| println!("[tap] downstream cancelled"))
        .subscribe(Subscriber::on_next(|v| println!("Emitted {}", v)));

    // Do something else here.
    time::sleep(time::Duration::from_millis(100)).await;
    subscription.cancel();

    // The tap and `map` hand the receiving task's handle to the outer subscription.
    if subscription.join_concurrent().await.is_err() {
        // Handle error
    }

    println!("`main` function done")
}

use std::env;

use rudp::{Config, Endpoint, RudpEvent};

fn main() -> std::io::Result<()> {
    env_logger::init();

    let port: u16 = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7002);

    let mut endpoint = Endpoint::open(Config::default(), port)?;
    println!("rudp server listening on {}", endpoint.local_addr());

    endpoint.register_event_callback(|event, peer| match event {
        RudpEvent::Timeout => eprintln!("session with {} timed out", peer),
        RudpEvent::Closed => println!("endpoint closed"),
    });

    endpoint.register_data_callback(|peer, data| {
        println!("{} bytes from {}: {:?}", data.len(), peer, String::from_utf8_lossy(data));
    });

    endpoint.run()
}

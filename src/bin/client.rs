use std::env;
use std::net::SocketAddr;

use rudp::{Config, Endpoint, RudpEvent};

fn main() -> std::io::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let peer: SocketAddr = args
        .next()
        .expect("usage: rudp-client <peer addr> [message...]")
        .parse()
        .expect("peer must be an ip:port address");
    let messages: Vec<String> = args.collect();
    let messages = if messages.is_empty() {
        vec!["hello".to_string()]
    } else {
        messages
    };

    let mut endpoint = Endpoint::open(Config::default(), 0)?;
    println!("rudp client on {} sending to {}", endpoint.local_addr(), peer);

    endpoint.register_event_callback(|event, peer| match event {
        RudpEvent::Timeout => eprintln!("session with {} timed out", peer),
        RudpEvent::Closed => {
            println!("endpoint closed");
        }
    });
    endpoint.register_data_callback(|peer, data| {
        println!("{} bytes from {}: {:?}", data.len(), peer, String::from_utf8_lossy(data));
    });

    for message in &messages {
        endpoint
            .send(message.as_bytes(), peer)
            .expect("payload within configured max_packet_size");
    }
    endpoint.close();

    endpoint.run()
}

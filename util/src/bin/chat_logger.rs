use std::fs;
use std::process;
use std::time::Duration;

use clap::{Arg, Command};
use serde_derive::Deserialize;

use kappa::logging;
use kappa::net::client::{Client, EventHandler};
use kappa::net::connection::Connection;
use kappa::net::message::{CommandType, Event};

#[derive(Deserialize)]
struct ChatConfig {
    nickname: String,
    password: String,
    channel: String,
}

/// Joins the configured channel once the login completes and prints chat.
struct ChatLogger {
    channel: String,
    joined: bool,
}

impl EventHandler for ChatLogger {
    fn on_event(&mut self, connection: &mut Connection, event: &Event<'_>) {
        match event.kind {
            CommandType::Authenticated | CommandType::GlobalUserState => {
                if !self.joined {
                    self.joined = true;
                    drop(connection.join(&self.channel));
                }
            }
            CommandType::Privmsg => {
                println!(
                    "{} {}: {}",
                    event.channel.unwrap_or("?"),
                    event.origin.unwrap_or("?"),
                    event.message.unwrap_or("")
                );
            }
            CommandType::CtcpAction => {
                println!(
                    "{} * {} {}",
                    event.channel.unwrap_or("?"),
                    event.origin.unwrap_or("?"),
                    event.message.unwrap_or("")
                );
            }
            _ => {}
        }
    }
}

fn main() {
    let matches = Command::new("chat_logger")
        .about("Connects to chat with a JSON config and prints what it hears")
        .arg(Arg::new("config").required(true).help("Path to the JSON chat config"))
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("config argument is required");
    let config_file = fs::File::open(config_path).expect("config file must exist");
    let config: ChatConfig = serde_json::from_reader(config_file).expect("config file must parse");

    let log = logging::init();

    let handler = ChatLogger {
        channel: config.channel.clone(),
        joined: false,
    };

    let mut client = Client::new(handler, Some(&log));

    if let Err(error) = client.connect(&config.nickname, &config.password) {
        logging::error!(log, "connect failed"; "error" => ?error);
        process::exit(1);
    }

    loop {
        if let Err(error) = client.poll_once(Some(Duration::from_millis(500))) {
            logging::error!(log, "connection lost"; "error" => ?error,
                            "last_error" => ?client.connection().last_error());
            break;
        }
    }
}

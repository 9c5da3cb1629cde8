extern crate chrono;
extern crate clap;
extern crate ctrlc;
extern crate log;
extern crate log4rs;
extern crate serde_json;

use std::fs::File;
use std::io::Read;
use std::process::exit;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::App;
use serde::{Deserialize, Serialize};
use teloxide::Bot;

mod bot;
mod chart;
mod client;
mod format;
mod projection;
mod record;

static DEFAULT_CONFIG_PATH: &str = "resources/isensor-bot.yml";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Configuration {
    pub client_parameters: client::ClientParameters,
    pub bot_parameters: bot::BotParameters,
    pub format_parameters: format::FormatParameters,
    pub chart_parameters: chart::ChartParameters,
}

#[tokio::main]
async fn main() {
    let cli_yaml = clap::load_yaml!("cli.yml");
    let matches = App::from(cli_yaml).get_matches();

    match log4rs::init_file("resources/log.yml", Default::default()) {
        Ok(_) => {}
        Err(err) => {
            log::error!("Could not create logger from yaml configuration: {}", err);
            exit(-100);
        }
    };

    let token = match matches.value_of("token") {
        Some(token) => String::from(token),
        None => {
            log::error!(target: "isensor", "Token is not specified!");
            exit(101);
        }
    };

    let configuration_path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG_PATH);

    let mut configuration_file = match File::open(configuration_path) {
        Ok(file) => file,
        Err(err) => {
            log::error!(target: "isensor", "Cannot open the configuration file: '{}'", err);
            exit(102);
        }
    };

    let mut configuration_string = String::new();
    match configuration_file.read_to_string(&mut configuration_string) {
        Ok(_) => {}
        Err(err) => {
            log::error!(target: "isensor", "Cannot read the configuration from file: '{}'", err);
            exit(103);
        }
    };

    let configuration = match serde_yaml::from_str::<Configuration>(configuration_string.as_str()) {
        Ok(res) => res,
        Err(err) => {
            log::error!(target: "isensor", "Cannot deserialize the configuration: '{}'", err);
            exit(104);
        }
    };

    let terminate = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let terminate_handler = Arc::clone(&terminate);

    match ctrlc::set_handler(move || {
        log::info!(target: "isensor", "Termination signal received!");
        terminate_handler.store(true, Ordering::SeqCst);
    }) {
        Ok(_) => {}
        Err(err) => {
            log::error!(target: "isensor", "Could not set the termination handler: '{}'", err);
            exit(105);
        }
    };

    let telegram_bot = Bot::new(token);

    log::info!(target: "isensor", "Starting the update loop!");
    match bot::run(&telegram_bot, &configuration, terminate).await {
        Ok(_) => {}
        Err(err) => {
            log::error!(target: "isensor", "Could not send a reply: '{}'", err);
            exit(201);
        }
    };

    log::info!(target: "isensor", "Exiting");
    exit(0);
}

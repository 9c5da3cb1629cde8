//! Module for the Telegram dispatch loop and the keyboard menu state machine.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InputFile, KeyboardButton, KeyboardMarkup, ReplyMarkup, UpdateKind,
};
use teloxide::RequestError;

use crate::chart::{self, ProjectedSeries};
use crate::client;
use crate::format;
use crate::projection::{self, Metric};
use crate::Configuration;

static HELLO_TEXT: &str = "Hello!\nI'm the isensor Telegram bot. Press /open to open the keyboard.";
static HELP_TEXT: &str =
    "Press /open to open the keyboard and /close to hide it.\nThe keyboard shows the current sensor readings or renders the last updates as a chart.";
static FALLBACK_TEXT: &str = "Can't do request";

static STATUS_BUTTON: &str = "Sensor data🌡️";
static CHART_BUTTON: &str = "Gen Chart";
static BACK_BUTTON: &str = "Back";

#[derive(Serialize, Deserialize, Debug, Clone)]
/// Struct modeling the parameters for the Telegram update loop.
pub struct BotParameters {
    /// Long poll timeout for `getUpdates` in seconds.
    pub poll_timeout_secs: u32,
}

/// Menu position of one chat, tracked explicitly instead of being inferred
/// from whichever keyboard was last sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    MainMenu,
    ChartMenu,
}

/// Reply the dispatcher owes the chat after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SendHello,
    SendHelp,
    ShowMainMenu,
    RemoveKeyboard,
    SendStatus,
    ShowChartMenu,
    SendChart(u32),
    Ignore,
}

impl MenuState {
    /// Computes the follow-up state and reply for one inbound text.
    ///
    /// Commands work from every state; button labels only act in the menu
    /// that shows them, everything else is ignored.
    pub fn on_input(self, text: &str) -> (MenuState, Action) {
        match (self, text) {
            (_, "/start") => (MenuState::MainMenu, Action::SendHello),
            (_, "/help") => (self, Action::SendHelp),
            (_, "/open") => (MenuState::MainMenu, Action::ShowMainMenu),
            (_, "/close") => (MenuState::Closed, Action::RemoveKeyboard),
            (MenuState::MainMenu, _) if text == STATUS_BUTTON => (self, Action::SendStatus),
            (MenuState::MainMenu, _) if text == CHART_BUTTON => {
                (MenuState::ChartMenu, Action::ShowChartMenu)
            }
            (MenuState::ChartMenu, _) if text == BACK_BUTTON => {
                (MenuState::MainMenu, Action::ShowMainMenu)
            }
            (MenuState::ChartMenu, "5") => (self, Action::SendChart(5)),
            (MenuState::ChartMenu, "10") => (self, Action::SendChart(10)),
            (MenuState::ChartMenu, "15") => (self, Action::SendChart(15)),
            _ => (self, Action::Ignore),
        }
    }
}

fn main_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![
            vec![KeyboardButton::new(STATUS_BUTTON)],
            vec![KeyboardButton::new(CHART_BUTTON)],
        ])
        .resize_keyboard(true),
    )
}

fn chart_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![
            vec![
                KeyboardButton::new("5"),
                KeyboardButton::new("10"),
                KeyboardButton::new("15"),
            ],
            vec![KeyboardButton::new(BACK_BUTTON)],
        ])
        .resize_keyboard(true),
    )
}

/// Runs the update loop until the termination flag is set.
///
/// Updates are consumed strictly in order, one handled to completion before
/// the next is read. Poll failures are logged and retried; a failure to send
/// a reply is returned to the caller and terminates the process.
pub async fn run(
    bot: &Bot,
    configuration: &Configuration,
    terminate: Arc<AtomicBool>,
) -> Result<(), RequestError> {
    let http = reqwest::Client::new();
    let mut menu_states: HashMap<ChatId, MenuState> = HashMap::new();
    let mut offset: i32 = 0;

    while !terminate.load(Ordering::SeqCst) {
        let updates = match bot
            .get_updates()
            .offset(offset)
            .timeout(configuration.bot_parameters.poll_timeout_secs)
            .await
        {
            Ok(updates) => updates,
            Err(err) => {
                log::error!(target: "isensor::bot", "Could not poll for updates: '{}'", err);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        for update in updates {
            offset = update.id + 1;
            let message = match update.kind {
                UpdateKind::Message(message) => message,
                _ => continue,
            };
            let text = match message.text() {
                Some(text) => text.to_owned(),
                None => continue,
            };
            let chat = message.chat.id;

            let state = menu_states
                .get(&chat)
                .copied()
                .unwrap_or(MenuState::Closed);
            let (next_state, action) = state.on_input(text.as_str());
            log::debug!(target: "isensor::bot", "Chat '{}': '{:?}' -> '{:?}' via '{:?}'", chat, state, next_state, action);
            menu_states.insert(chat, next_state);

            handle_action(bot, &http, configuration, chat, action).await?;
        }
    }

    Ok(())
}

async fn handle_action(
    bot: &Bot,
    http: &reqwest::Client,
    configuration: &Configuration,
    chat: ChatId,
    action: Action,
) -> Result<(), RequestError> {
    match action {
        Action::SendHello => {
            bot.send_message(chat, HELLO_TEXT)
                .reply_markup(main_keyboard())
                .await?;
        }
        Action::SendHelp => {
            bot.send_message(chat, HELP_TEXT).await?;
        }
        Action::ShowMainMenu => {
            bot.send_message(chat, "Main menu")
                .reply_markup(main_keyboard())
                .await?;
        }
        Action::RemoveKeyboard => {
            bot.send_message(chat, "Keyboard closed")
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
        }
        Action::SendStatus => match status_reply(http, configuration).await {
            Ok(text) => {
                bot.send_message(chat, text).await?;
            }
            Err(err) => {
                log::error!(target: "isensor::bot", "Could not build the status reply: '{}'", err);
                bot.send_message(chat, FALLBACK_TEXT).await?;
            }
        },
        Action::ShowChartMenu => {
            bot.send_message(chat, "Choose number of iterations")
                .reply_markup(chart_keyboard())
                .await?;
        }
        Action::SendChart(points) => match chart_reply(http, configuration, points).await {
            Ok((png, caption)) => {
                let photo = InputFile::memory(png).file_name("chart.png");
                bot.send_photo(chat, photo).caption(caption).await?;
            }
            Err(err) => {
                log::error!(target: "isensor::bot", "Could not build the chart reply: '{}'", err);
                bot.send_message(chat, FALLBACK_TEXT).await?;
            }
        },
        Action::Ignore => {
            log::debug!(target: "isensor::bot", "Ignoring input for chat '{}'", chat);
        }
    }

    Ok(())
}

/// Fetches the most recent record and formats the status text.
async fn status_reply(
    http: &reqwest::Client,
    configuration: &Configuration,
) -> Result<String, String> {
    let series = match client::fetch(http, &configuration.client_parameters, 1).await {
        Ok(series) => series,
        Err(err) => return Err(err.to_string()),
    };
    Ok(format::format_status(
        &series,
        &configuration.format_parameters,
    ))
}

/// Fetches the requested number of records, renders the chart and builds the
/// time range caption. The series is fetched fresh for this one reply and
/// dropped afterwards.
async fn chart_reply(
    http: &reqwest::Client,
    configuration: &Configuration,
    points: u32,
) -> Result<(Vec<u8>, String), String> {
    let series = match client::fetch(http, &configuration.client_parameters, points).await {
        Ok(series) => series,
        Err(err) => return Err(err.to_string()),
    };

    let mut series_set: Vec<ProjectedSeries> = Vec::with_capacity(4);
    for metric in [
        Metric::Temperature,
        Metric::Pressure,
        Metric::Humidity,
        Metric::Uv,
    ] {
        let (xs, ys) = match projection::project(
            &series,
            metric,
            points as usize,
            &configuration.chart_parameters.scale,
        ) {
            Ok(projected) => projected,
            Err(err) => return Err(err.to_string()),
        };
        series_set.push(ProjectedSeries {
            name: metric.name(),
            xs,
            ys,
        });
    }

    let png = match chart::render_png(&series_set, &configuration.chart_parameters) {
        Ok(png) => png,
        Err(err) => return Err(err.to_string()),
    };

    let caption = format::format_time_range(
        &series,
        points as usize,
        &configuration.format_parameters,
    );
    Ok((png, caption))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_opens_main_menu_from_anywhere() {
        for state in [MenuState::Closed, MenuState::MainMenu, MenuState::ChartMenu] {
            assert_eq!(
                state.on_input("/start"),
                (MenuState::MainMenu, Action::SendHello)
            );
        }
    }

    #[test]
    fn close_removes_keyboard_from_anywhere() {
        for state in [MenuState::Closed, MenuState::MainMenu, MenuState::ChartMenu] {
            assert_eq!(
                state.on_input("/close"),
                (MenuState::Closed, Action::RemoveKeyboard)
            );
        }
    }

    #[test]
    fn help_keeps_current_state() {
        assert_eq!(
            MenuState::ChartMenu.on_input("/help"),
            (MenuState::ChartMenu, Action::SendHelp)
        );
    }

    #[test]
    fn status_button_acts_only_in_main_menu() {
        assert_eq!(
            MenuState::MainMenu.on_input(STATUS_BUTTON),
            (MenuState::MainMenu, Action::SendStatus)
        );
        assert_eq!(
            MenuState::Closed.on_input(STATUS_BUTTON),
            (MenuState::Closed, Action::Ignore)
        );
    }

    #[test]
    fn chart_menu_round_trip() {
        let (state, action) = MenuState::MainMenu.on_input(CHART_BUTTON);
        assert_eq!(state, MenuState::ChartMenu);
        assert_eq!(action, Action::ShowChartMenu);

        assert_eq!(
            state.on_input("10"),
            (MenuState::ChartMenu, Action::SendChart(10))
        );
        assert_eq!(
            state.on_input(BACK_BUTTON),
            (MenuState::MainMenu, Action::ShowMainMenu)
        );
    }

    #[test]
    fn chart_sizes_act_only_in_chart_menu() {
        assert_eq!(
            MenuState::MainMenu.on_input("5"),
            (MenuState::MainMenu, Action::Ignore)
        );
        assert_eq!(
            MenuState::ChartMenu.on_input("5"),
            (MenuState::ChartMenu, Action::SendChart(5))
        );
    }

    #[test]
    fn unknown_input_is_ignored() {
        assert_eq!(
            MenuState::MainMenu.on_input("what?"),
            (MenuState::MainMenu, Action::Ignore)
        );
    }

    #[test]
    fn five_point_chart_pipeline() {
        let body = r#"[
            {"id": 5, "temperature": 20, "humidity": 40, "pressure": 10130, "uv": 1, "date": "2023-03-05T13:30:00Z"},
            {"id": 4, "temperature": 21, "humidity": 41, "pressure": 10131, "uv": 2, "date": "2023-03-05T13:00:00Z"},
            {"id": 3, "temperature": 22, "humidity": 42, "pressure": 10132, "uv": 3, "date": "2023-03-05T12:30:00Z"},
            {"id": 2, "temperature": 23, "humidity": 43, "pressure": 10133, "uv": 2, "date": "2023-03-05T12:00:00Z"},
            {"id": 1, "temperature": 24, "humidity": 44, "pressure": 10134, "uv": 1, "date": "2023-03-05T11:30:00Z"}
        ]"#;
        let series = client::parse_series(body).unwrap();

        let scale = crate::projection::ScaleParameters {
            temperature: 1.0,
            humidity: 1.0,
            pressure: 0.1,
            uv: 1.0,
        };
        let (xs, ys) = projection::project(&series, Metric::Temperature, 5, &scale).unwrap();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ys, vec![20.0, 21.0, 22.0, 23.0, 24.0]);

        let mut series_set = Vec::new();
        for metric in [
            Metric::Temperature,
            Metric::Pressure,
            Metric::Humidity,
            Metric::Uv,
        ] {
            let (xs, ys) = projection::project(&series, metric, 5, &scale).unwrap();
            series_set.push(ProjectedSeries {
                name: metric.name(),
                xs,
                ys,
            });
        }
        let parameters = crate::chart::ChartParameters {
            width: 400,
            height: 300,
            scale,
        };
        let png = chart::render_png(&series_set, &parameters).unwrap();
        assert!(!png.is_empty());
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }
}

use crate::dispatcher::{ActionDispatcher, DispatchError};
use crate::domain::alarm::split_time;
use crate::domain::ValidationError;
use std::io;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, instrument, warn};

const HELP: &str = "add HH:MM[:SS] | delete N | toggle N | snooze | refresh | sensors | test COMPONENT ACTION | \
                    start | stop | status | hardware | connect | disconnect | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Add { hour: u32, minute: u32, second: u32 },
    Delete(usize),
    Toggle(usize),
    Snooze,
    Refresh,
    Sensors,
    Test { component: String, action: String },
    Start,
    Stop,
    Status,
    Hardware,
    Connect,
    Disconnect,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Time(#[from] ValidationError),
}

impl FromStr for UserCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();

        let command = match words.as_slice() {
            ["add", time] => {
                let (hour, minute, second) = split_time(time)?;
                UserCommand::Add { hour, minute, second }
            }
            ["add", ..] => return Err(CommandError::Usage("add HH:MM[:SS]")),
            ["delete", index] => UserCommand::Delete(parse_index(index, "delete N")?),
            ["delete", ..] => return Err(CommandError::Usage("delete N")),
            ["toggle", index] => UserCommand::Toggle(parse_index(index, "toggle N")?),
            ["toggle", ..] => return Err(CommandError::Usage("toggle N")),
            ["test", component, action] => UserCommand::Test {
                component: component.to_string(),
                action: action.to_string(),
            },
            ["test", ..] => return Err(CommandError::Usage("test COMPONENT ACTION")),
            ["snooze"] => UserCommand::Snooze,
            ["refresh"] => UserCommand::Refresh,
            ["sensors"] => UserCommand::Sensors,
            ["start"] => UserCommand::Start,
            ["stop"] => UserCommand::Stop,
            ["status"] => UserCommand::Status,
            ["hardware"] => UserCommand::Hardware,
            ["connect"] => UserCommand::Connect,
            ["disconnect"] => UserCommand::Disconnect,
            ["help"] => UserCommand::Help,
            ["quit"] | ["exit"] => UserCommand::Quit,
            _ => return Err(CommandError::Unknown(s.trim().to_string())),
        };

        Ok(command)
    }
}

fn parse_index(index: &str, usage: &'static str) -> Result<usize, CommandError> {
    index.parse().map_err(|_| CommandError::Usage(usage))
}

/// Reads commands line by line until `quit` or the end of input.
#[instrument(skip_all)]
pub async fn run<R>(dispatcher: &ActionDispatcher, input: R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    info!("⌨️ Ready for commands: {}", HELP);
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<UserCommand>() {
            Ok(UserCommand::Quit) => break,
            Ok(command) => execute(dispatcher, command).await,
            Err(e) => warn!("⚠️ {}", e),
        }
    }

    Ok(())
}

async fn execute(dispatcher: &ActionDispatcher, command: UserCommand) {
    match command {
        UserCommand::Add { hour, minute, second } => report("Adding alarm", dispatcher.add_alarm(hour, minute, second).await),
        UserCommand::Delete(index) => report("Deleting alarm", dispatcher.delete_alarm(index).await),
        UserCommand::Toggle(index) => report("Toggling alarm", dispatcher.toggle_alarm(index).await),
        UserCommand::Snooze => report("Snoozing alarm", dispatcher.snooze().await),
        UserCommand::Refresh => report("Refreshing alarms", dispatcher.refresh_alarms().await.map(|()| None)),
        UserCommand::Sensors => report("Requesting sensor data", dispatcher.request_sensors().await.map(|()| None)),
        UserCommand::Test { component, action } => {
            dispatcher.test_component(&component, &action).await;
        }
        UserCommand::Start => report("Starting alarm script", dispatcher.start_script().await),
        UserCommand::Stop => report("Stopping alarm script", dispatcher.stop_script().await),
        UserCommand::Status => match dispatcher.script_status().await {
            Ok(status) => info!(
                connection = %dispatcher.connection_state(),
                "📋 Script running: {}, interface running: {}, server time: {}",
                status.script_running,
                status.interface_running,
                status.server_time.as_deref().unwrap_or("--")
            ),
            Err(e) => warn!("🔴 Fetching script status... failed: {}", e),
        },
        UserCommand::Hardware => match dispatcher.hardware_status().await {
            Ok(status) => info!(
                "🔧 Hardware available: {}, components: {}",
                status.hardware_available,
                status.components.join(", ")
            ),
            Err(e) => warn!("🔴 Fetching hardware status... failed: {}", e),
        },
        UserCommand::Connect => {
            let state = dispatcher.connect().await;
            info!("📡 Connection: {}", state);
        }
        UserCommand::Disconnect => dispatcher.disconnect().await,
        UserCommand::Help => info!("⌨️ {}", HELP),
        UserCommand::Quit => {}
    }
}

fn report(action: &str, result: Result<Option<String>, DispatchError>) {
    match result {
        Ok(Some(message)) => info!("✅ {}... OK: {}", action, message),
        Ok(None) => info!("✅ {}... OK", action),
        Err(e) => warn!("🔴 {}... failed: {}", action, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use crate::testing::{ConnectOutcome, FakeBackend, FakePushChannel};
    use crate::transport::{TransportCoordinator, TransportSettings};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[rstest]
    #[case("add 7:30", UserCommand::Add { hour: 7, minute: 30, second: 0 })]
    #[case("add 07:30:15", UserCommand::Add { hour: 7, minute: 30, second: 15 })]
    #[case("add 25:00", UserCommand::Add { hour: 25, minute: 0, second: 0 })]
    #[case("  toggle 2 ", UserCommand::Toggle(2))]
    #[case("delete 0", UserCommand::Delete(0))]
    #[case("test led on", UserCommand::Test { component: "led".to_string(), action: "on".to_string() })]
    #[case("snooze", UserCommand::Snooze)]
    #[case("exit", UserCommand::Quit)]
    fn parses_commands(#[case] input: &str, #[case] expected: UserCommand) {
        assert_eq!(input.parse::<UserCommand>(), Ok(expected));
    }

    #[rstest]
    #[case("add", CommandError::Usage("add HH:MM[:SS]"))]
    #[case("add 7h30", CommandError::Time(ValidationError::Format("7h30".to_string())))]
    #[case("toggle -1", CommandError::Usage("toggle N"))]
    #[case("test led", CommandError::Usage("test COMPONENT ACTION"))]
    #[case("dance", CommandError::Unknown("dance".to_string()))]
    fn rejects_malformed_commands(#[case] input: &str, #[case] expected: CommandError) {
        assert_eq!(input.parse::<UserCommand>(), Err(expected));
    }

    #[tokio::test]
    async fn runs_commands_until_quit() {
        let backend = Arc::new(FakeBackend::default());
        let (tx, _events) = mpsc::channel(64);
        let coordinator = TransportCoordinator::new(
            Arc::new(FakePushChannel::new(ConnectOutcome::Refuse)),
            backend.clone(),
            tx.clone(),
            TransportSettings::from(&AppConfigBuilder::new().build()),
        );
        let dispatcher = ActionDispatcher::new(coordinator, tx);
        let input: &[u8] = b"add 07:30\n\nbogus\nadd 24:00\ntoggle 0\nquit\nadd 08:00\n";

        run(&dispatcher, input).await.unwrap();

        assert_eq!(backend.calls_to("POST /alarm"), 1);
        assert_eq!(backend.calls_to("POST /alarm/0/toggle"), 1);
        assert!(!backend.alarms_now()[0].active);
    }
}

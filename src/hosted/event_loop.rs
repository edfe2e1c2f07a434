//! Command-driven event loop hosted on its own worker thread
//!
//! The loop runs a current-thread tokio runtime and owns its [`Scene`]
//! outright; launchers reach it only through [`LoopCommand`] messages.

use crate::worker::{HostedTask, Reply, TaskContext, TaskResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownVerb(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
}

/// State change applied by the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Show(String),
    Clear,
    Refresh,
    Quit,
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match (verb.as_str(), arg) {
            ("", _) => Err(ActionParseError::Empty),
            ("show", Some(name)) => Ok(Action::Show(name.to_string())),
            ("show", None) => Err(ActionParseError::MissingArgument("show")),
            ("clear", _) => Ok(Action::Clear),
            ("refresh", _) => Ok(Action::Refresh),
            ("quit" | "exit", _) => Ok(Action::Quit),
            (other, _) => Err(ActionParseError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Show(name) => write!(f, "show {name}"),
            Action::Clear => f.write_str("clear"),
            Action::Refresh => f.write_str("refresh"),
            Action::Quit => f.write_str("quit"),
        }
    }
}

/// Messages accepted by [`EventLoop`]
#[derive(Debug)]
pub enum LoopCommand {
    Apply(Action),
    Snapshot(Reply<LoopSnapshot>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopSnapshot {
    pub items: Vec<String>,
    pub frames: u64,
    pub refreshes: u64,
    pub commands_handled: u64,
}

/// Loop-owned state; never shared with the launcher
#[derive(Debug, Default)]
struct Scene {
    items: Vec<String>,
    frames: u64,
    refreshes: u64,
    commands_handled: u64,
}

enum Flow {
    Continue,
    Quit,
}

impl Scene {
    fn handle(&mut self, command: LoopCommand) -> Flow {
        self.commands_handled += 1;
        match command {
            LoopCommand::Apply(action) => {
                debug!(%action, "Applying action");
                match action {
                    Action::Show(name) => self.items.push(name),
                    Action::Clear => self.items.clear(),
                    Action::Refresh => self.refreshes += 1,
                    Action::Quit => return Flow::Quit,
                }
            }
            LoopCommand::Snapshot(reply) => {
                // Requester may have given up; nothing to do then.
                let _ = reply.send(self.snapshot());
            }
        }
        Flow::Continue
    }

    fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            items: self.items.clone(),
            frames: self.frames,
            refreshes: self.refreshes,
            commands_handled: self.commands_handled,
        }
    }
}

/// Hosted task that processes [`LoopCommand`]s until stopped.
///
/// Leaves its loop on a stop request, an [`Action::Quit`], or when every
/// sender to its mailbox is gone.
#[derive(Debug, Clone)]
pub struct EventLoop {
    tick: Duration,
}

impl EventLoop {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl HostedTask<LoopCommand> for EventLoop {
    fn run(self: Box<Self>, ctx: TaskContext<LoopCommand>) -> TaskResult {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let TaskContext {
            worker,
            ready,
            stop,
            mut mailbox,
        } = ctx;
        let tick = self.tick;

        runtime.block_on(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut scene = Scene::default();

            // The runtime is driving this future, so queued commands get served
            // from here on.
            ready.signal_ready();

            loop {
                tokio::select! {
                    biased;
                    _ = stop.requested() => {
                        debug!("Stop requested, leaving loop");
                        break;
                    }
                    command = mailbox.recv() => match command {
                        Some(command) => {
                            if let Flow::Quit = scene.handle(command) {
                                info!(%worker, "Quit received, leaving loop");
                                break;
                            }
                        }
                        None => {
                            debug!("Mailbox closed, leaving loop");
                            break;
                        }
                    },
                    _ = ticker.tick() => scene.frames += 1,
                }
            }

            info!(
                %worker,
                frames = scene.frames,
                commands = scene.commands_handled,
                "Event loop finished"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{WorkerHandle, WorkerState};

    #[test]
    fn test_parse_actions() {
        assert_eq!("show cube".parse::<Action>(), Ok(Action::Show("cube".into())));
        assert_eq!("  SHOW  big sphere ".parse::<Action>(), Ok(Action::Show("big sphere".into())));
        assert_eq!("clear".parse::<Action>(), Ok(Action::Clear));
        assert_eq!("refresh".parse::<Action>(), Ok(Action::Refresh));
        assert_eq!("exit".parse::<Action>(), Ok(Action::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("".parse::<Action>(), Err(ActionParseError::Empty));
        assert_eq!("show".parse::<Action>(), Err(ActionParseError::MissingArgument("show")));
        assert_eq!(
            "rotate 90".parse::<Action>(),
            Err(ActionParseError::UnknownVerb("rotate".into()))
        );
    }

    #[test]
    fn test_action_display_parses_back() {
        for action in [Action::Show("cone".into()), Action::Clear, Action::Refresh, Action::Quit] {
            assert_eq!(action.to_string().parse::<Action>(), Ok(action));
        }
    }

    #[test]
    fn test_scene_applies_actions_in_order() {
        let mut scene = Scene::default();
        scene.handle(LoopCommand::Apply(Action::Show("box".into())));
        scene.handle(LoopCommand::Apply(Action::Clear));
        scene.handle(LoopCommand::Apply(Action::Show("cylinder".into())));
        scene.handle(LoopCommand::Apply(Action::Refresh));

        let snapshot = scene.snapshot();
        assert_eq!(snapshot.items, vec!["cylinder".to_string()]);
        assert_eq!(snapshot.refreshes, 1);
        assert_eq!(snapshot.commands_handled, 4);
    }

    #[test]
    fn test_loop_serves_commands_and_snapshots() {
        let handle = WorkerHandle::new(EventLoop::new(Duration::from_millis(5)));
        handle.start().unwrap();

        handle.post(LoopCommand::Apply(Action::Show("sphere".into()))).unwrap();
        handle.post(LoopCommand::Apply(Action::Show("cone".into()))).unwrap();
        let snapshot = handle.request(LoopCommand::Snapshot).unwrap();

        assert_eq!(snapshot.items, vec!["sphere".to_string(), "cone".to_string()]);
        assert_eq!(snapshot.commands_handled, 3);

        handle.request_stop().unwrap();
        assert!(handle.wait_end(Some(Duration::from_secs(5))));
        assert!(handle.confirm_exit(100, Duration::from_millis(5)));
    }

    #[test]
    fn test_quit_ends_loop_without_stop_request() {
        let handle = WorkerHandle::new(EventLoop::default());
        handle.start().unwrap();

        handle.post(LoopCommand::Apply(Action::Quit)).unwrap();
        assert!(handle.wait_end(Some(Duration::from_secs(5))));
        assert_eq!(handle.state(), WorkerState::Terminated);
        assert!(handle.outcome().unwrap().is_completed());
    }

    #[test]
    fn test_loop_ticks_while_idle() {
        let handle = WorkerHandle::new(EventLoop::new(Duration::from_millis(2)));
        handle.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let snapshot = handle.request(LoopCommand::Snapshot).unwrap();
        assert!(snapshot.frames > 1);
        assert!(handle.shutdown(Some(Duration::from_secs(5))));
    }
}

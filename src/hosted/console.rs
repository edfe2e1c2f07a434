use super::event_loop::{Action, LoopCommand};
use crate::worker::{HostedTask, Outbox, TaskContext, TaskResult};
use std::io::BufRead;
use tracing::{debug, info, warn};

/// Hosted task that reads command lines and forwards them to event loops.
///
/// Runs on its own worker, independent of the loops it drives. Blank lines and
/// `#` comments are skipped; `quit` is forwarded and then ends the console.
pub struct Console<R> {
    input: R,
    targets: Vec<Outbox<LoopCommand>>,
}

impl<R: BufRead + Send + 'static> Console<R> {
    pub fn new(input: R, targets: Vec<Outbox<LoopCommand>>) -> Self {
        Self { input, targets }
    }
}

fn forward(targets: &[Outbox<LoopCommand>], action: &Action) {
    for target in targets {
        if let Err(e) = target.post(LoopCommand::Apply(action.clone())) {
            warn!(worker_id = %target.worker(), %action, error = %e, "Could not forward command");
        }
    }
}

impl<R: BufRead + Send + 'static> HostedTask<()> for Console<R> {
    fn run(self: Box<Self>, ctx: TaskContext<()>) -> TaskResult {
        let Console { mut input, targets } = *self;

        ctx.ready.signal_ready();

        let mut forwarded = 0usize;
        let mut line = String::new();
        loop {
            if ctx.stop.is_requested() {
                debug!("Stop requested, closing console");
                break;
            }
            if !targets.is_empty() && targets.iter().all(Outbox::is_closed) {
                info!("Every target closed, closing console");
                break;
            }

            line.clear();
            if input.read_line(&mut line)? == 0 {
                debug!("Console input exhausted");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match trimmed.parse::<Action>() {
                Ok(action) => {
                    forward(&targets, &action);
                    forwarded += 1;
                    if action == Action::Quit {
                        info!("Quit entered at console");
                        break;
                    }
                }
                Err(e) => warn!(line = trimmed, error = %e, "Skipping console line"),
            }
        }

        info!(forwarded, "Console finished");
        Ok(())
    }
}

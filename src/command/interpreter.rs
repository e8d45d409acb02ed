//! Sequential command interpreter
//!
//! One inbound script expands into an ordered instruction list; a single
//! worker task consumes the queue strictly in order. At most one
//! instruction is in flight, so a suspension (pause, lock retry) holds up
//! everything queued behind it, including instructions from later scripts.

use std::sync::Arc;
use std::time::Duration;

use controlify_shared::script::{self, Instruction};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::locks::ResourceLockTable;
use super::registry::HandlerRegistry;
use super::runner::CommandRunner;

/// Owns the instruction queue and its worker task
pub struct CommandInterpreter {
    queue_tx: mpsc::UnboundedSender<String>,
    worker: JoinHandle<()>,
}

impl CommandInterpreter {
    /// Create the interpreter and start its worker task
    pub fn new(
        registry: HandlerRegistry,
        locks: Arc<ResourceLockTable>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_loop(queue_rx, registry, locks, runner));
        Self { queue_tx, worker }
    }

    /// Expand one inbound script and append it to the instruction queue
    pub fn submit(&self, script: &str) {
        debug!("received script: {}", script.replace('\n', "\\n"));
        for line in script::expand_script(script) {
            debug!("queueing: {line}");
            if self.queue_tx.send(line).is_err() {
                warn!("instruction queue is gone; dropping remainder of script");
                return;
            }
        }
    }

    /// Stop the worker, cancelling any in-flight wait
    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Drop for CommandInterpreter {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn worker_loop(
    mut queue_rx: mpsc::UnboundedReceiver<String>,
    registry: HandlerRegistry,
    locks: Arc<ResourceLockTable>,
    runner: Arc<dyn CommandRunner>,
) {
    while let Some(line) = queue_rx.recv().await {
        execute_line(&line, &registry, &locks, runner.as_ref()).await;
    }
}

/// Execute one instruction. Failures here are local: they are logged and the
/// queue moves on to the next instruction.
async fn execute_line(
    line: &str,
    registry: &HandlerRegistry,
    locks: &ResourceLockTable,
    runner: &dyn CommandRunner,
) {
    debug!("processing command: {line}");

    let instruction = match Instruction::parse(line) {
        Ok(instruction) => instruction,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    match instruction {
        Instruction::Lock(pin) => {
            if let Err(e) = locks.acquire(pin).await {
                error!("{e}");
            }
        }
        Instruction::Unlock(pins) => {
            locks.release_all(&pins).await;
        }
        Instruction::Pause(ms) => {
            debug!("pausing for {ms} ms");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Instruction::Invoke { verb, args } => match registry.template(&verb) {
            Some(template) => {
                let command_line = if args.is_empty() {
                    template.to_string()
                } else {
                    format!("{template} {}", args.join(" "))
                };
                if let Err(e) = runner.run(&command_line).await {
                    error!("handler error [{verb}]: {e}");
                }
            }
            None => error!("no handler for {verb}"),
        },
    }
}

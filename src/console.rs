use tokio::sync::mpsc;

use crate::commands::{self, CommandCtx};
use crate::events::{ReminderEvent, StatePayload};
use crate::models::{format_due, Task, TaskId};
use crate::scheduler::ReminderScheduler;
use crate::settings::Settings;
use crate::state::TaskStore;

pub const HELP: &str = "\
commands:
  add <YYYY-MM-DD HH:MM> <name>   create a task
  list                            show tasks
  done <n>                        toggle completion of task n
  delete <n>                      delete task n
  undo                            restore the last deleted task
  help                            show this text
  quit                            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add { due: String, name: String },
    List,
    Toggle(usize),
    Delete(usize),
    Undo,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue(Option<String>),
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match word.to_ascii_lowercase().as_str() {
        "add" => parse_add(rest),
        "list" | "ls" => Ok(ConsoleCommand::List),
        "done" | "toggle" => parse_position(rest).map(ConsoleCommand::Toggle),
        "delete" | "rm" => parse_position(rest).map(ConsoleCommand::Delete),
        "undo" => Ok(ConsoleCommand::Undo),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        "" => Err("type help for a list of commands".to_string()),
        other => Err(format!("unknown command {other:?}; type help")),
    }
}

fn parse_add(rest: &str) -> Result<ConsoleCommand, String> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(date), Some(time)) = (parts.next(), parts.next()) else {
        return Err("usage: add <YYYY-MM-DD HH:MM> <name>".to_string());
    };
    if date.is_empty() || time.is_empty() {
        return Err("usage: add <YYYY-MM-DD HH:MM> <name>".to_string());
    }
    Ok(ConsoleCommand::Add {
        due: format!("{date} {time}"),
        name: parts.next().unwrap_or("").trim().to_string(),
    })
}

fn parse_position(rest: &str) -> Result<usize, String> {
    match rest.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a task number, got {rest:?}")),
    }
}

pub fn render_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| format!("{}. {task}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_reminder(event: &ReminderEvent) -> String {
    format!(
        "Reminder: Task \"{}\" is due at {}.",
        event.name,
        format_due(&event.due_at)
    )
}

fn task_at(store: &TaskStore, position: usize) -> Option<TaskId> {
    store.list().get(position - 1).map(|task| task.id)
}

pub fn execute(
    ctx: &impl CommandCtx,
    store: &TaskStore,
    scheduler: &ReminderScheduler,
    command: ConsoleCommand,
) -> Outcome {
    let message = match command {
        ConsoleCommand::Add { due, name } => {
            let result = commands::create_task(ctx, store, &name, &due);
            result.error.map(|error| format!("Could not add task: {error}"))
        }
        ConsoleCommand::List => Some(render_list(&store.list())),
        ConsoleCommand::Toggle(position) => match task_at(store, position) {
            Some(id) => commands::toggle_complete(ctx, store, id).error,
            None => Some(format!("no task number {position}")),
        },
        ConsoleCommand::Delete(position) => match task_at(store, position) {
            Some(id) => commands::delete_task(ctx, store, scheduler, id).error,
            None => Some(format!("no task number {position}")),
        },
        ConsoleCommand::Undo => commands::undo_delete(ctx, store).error,
        ConsoleCommand::Help => Some(HELP.to_string()),
        ConsoleCommand::Quit => return Outcome::Quit,
    };
    Outcome::Continue(message)
}

struct StdoutCtx;

impl CommandCtx for StdoutCtx {
    fn emit_state_updated(&self, payload: StatePayload) {
        println!("{}", render_list(&payload.tasks));
        if payload.undo_available {
            println!("(undo available)");
        }
    }
}

pub async fn run_console(settings: Settings) {
    let store = TaskStore::new(settings.undo_limit);
    let (reminder_tx, mut reminder_rx) = mpsc::unbounded_channel();
    let scheduler = ReminderScheduler::new(store.clone(), reminder_tx, &settings);
    scheduler.start();

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });

    println!("{HELP}");
    let ctx = StdoutCtx;
    loop {
        tokio::select! {
            Some(event) = reminder_rx.recv() => println!("{}", render_reminder(&event)),
            line = line_rx.recv() => {
                let Some(line) = line else {
                    log::info!("input closed");
                    break;
                };
                let outcome = match parse_command(&line) {
                    Ok(command) => execute(&ctx, &store, &scheduler, command),
                    Err(message) => Outcome::Continue(Some(message)),
                };
                match outcome {
                    Outcome::Quit => break,
                    Outcome::Continue(Some(message)) => println!("{message}"),
                    Outcome::Continue(None) => {}
                }
            }
        }
    }

    scheduler.stop().await;
    log::info!("console session ended tasks={}", store.len());
}

//! End-to-end ledger scenarios against a real file on disk.
//!
//! Each test reopens the ledger between steps to mimic a process restart.

use std::collections::BTreeMap;

use auspex_models::command::{CommandStatus, PendingCommand};
use auspex_store::{CommandLedger, ConversationMemory};

fn make_command(id: &str, max_retries: u32) -> PendingCommand {
    let mut args = BTreeMap::new();
    args.insert("symbol".to_string(), "BTCUSDT".to_string());
    let mut cmd = PendingCommand::new("trader-1", "open_long", args, max_retries);
    cmd.id = id.to_string();
    cmd
}

#[test]
fn pending_then_completed_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commands.json");

    assert!(CommandLedger::new(&path)
        .load_pending_commands()
        .unwrap()
        .is_empty());

    let mut cmd = make_command("cmd1", 3);
    CommandLedger::new(&path).save_commands(&[cmd.clone()]).unwrap();

    let reopened = CommandLedger::new(&path);
    let pending = reopened.load_pending_commands().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "cmd1");

    cmd.mark_completed();
    CommandLedger::new(&path).save_commands(&[cmd]).unwrap();

    let store = CommandLedger::new(&path).load_store().unwrap();
    assert!(store.pending.is_empty());
    assert_eq!(store.completed.len(), 1);
    assert_eq!(store.completed[0].status, CommandStatus::Completed);
}

#[test]
fn failures_exhaust_into_terminal_list() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = CommandLedger::new(dir.path().join("commands.json"));

    let mut cmd = make_command("cmd2", 2);
    ledger.save_commands(&[cmd.clone()]).unwrap();

    cmd.status = CommandStatus::Failed;
    cmd.retry_count = 1;
    ledger.save_commands(&[cmd.clone()]).unwrap();
    let pending = ledger.load_pending_commands().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 1);

    cmd.retry_count = 2;
    ledger.save_commands(&[cmd]).unwrap();

    let store = ledger.load_store().unwrap();
    assert_eq!(store.failed.len(), 1);
    assert!(store.pending.is_empty());
    assert!(ledger.load_pending_commands().unwrap().is_empty());
}

#[test]
fn load_pending_never_returns_exhausted_commands() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = CommandLedger::new(dir.path().join("commands.json"));

    let batch: Vec<PendingCommand> = (0..12)
        .map(|i| {
            let mut cmd = make_command(&format!("cmd-{i}"), 3);
            for _ in 0..(i % 5) {
                cmd.mark_failed("exchange unavailable");
            }
            cmd
        })
        .collect();
    ledger.save_commands(&batch).unwrap();

    let pending = ledger.load_pending_commands().unwrap();
    assert!(!pending.is_empty());
    assert!(pending.iter().all(|c| c.retry_count < c.max_retries));

    let store = ledger.load_store().unwrap();
    assert_eq!(store.pending.len() + store.failed.len(), 12);
}

#[test]
fn archive_bounds_history_lists() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = CommandLedger::new(dir.path().join("commands.json"));

    let batch: Vec<PendingCommand> = (0..75)
        .map(|i| {
            let mut cmd = make_command(&format!("cmd-{i}"), 1);
            if i % 2 == 0 {
                cmd.mark_completed();
            } else {
                cmd.mark_failed("rejected");
            }
            cmd
        })
        .collect();
    ledger.save_commands(&batch).unwrap();
    ledger.archive_completed_commands().unwrap();

    let store = ledger.load_store().unwrap();
    assert!(store.completed.len() <= 50);
    assert!(store.failed.len() <= 50);
    assert_eq!(store.failed.last().unwrap().id, "cmd-73");
}

#[test]
fn memory_survives_restart_with_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory/transcript.txt");

    let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
    let saved = ConversationMemory::new(&path, 20)
        .save_memory(&words.join(" "))
        .unwrap();
    assert!(saved.truncated);

    let loaded = ConversationMemory::new(&path, 20).load_memory().unwrap();
    assert_eq!(loaded, words[5..].join(" "));
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    challenge_html, expired_html, listing_html, listing_url, test_settings, thread_html,
    MemoryQueue, MemoryStore, NeverGate, ScriptedPage, ScriptedProvider, SolvedGate,
    UnreachableQueue,
};
use harvestrs::domain::models::{Checkpoint, HarvestTask};
use harvestrs::infrastructure::checkpoint::CheckpointStore;
use harvestrs::session::parser::TiebaParser;
use harvestrs::workers::{HarvestError, HarvestWorker, TaskOutcome};
use std::sync::Arc;

const BASE: &str = "https://forum.test";

fn write_credentials(dir: &std::path::Path, entries: &[&str]) {
    std::fs::write(dir.join("cookies.txt"), entries.join("\n")).unwrap();
}

#[tokio::test]
async fn test_end_to_end_with_expired_credential_rotation() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1", "c2"]);
    let settings = Arc::new(test_settings(dir.path()));

    // 1. Seed one task covering a single listing page with two threads
    let queue = Arc::new(MemoryQueue::new());
    let task = HarvestTask::new("rust", 1, 1);
    queue.seed(task.clone());

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("帖子一", "/p/1001"), ("帖子二", "/p/1002")])),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["一楼", "二楼"], false)),
    );
    // Thread two: the credential expires mid-thread, then the fresh session succeeds
    provider.script(
        "https://forum.test/p/1002?pn=1",
        ScriptedPage::Html(expired_html()),
    );
    provider.script(
        "https://forum.test/p/1002?pn=1",
        ScriptedPage::Html(thread_html(&["只有一楼"], false)),
    );

    let store = Arc::new(MemoryStore::new());

    // 2. Run the worker until the queue drains
    let worker = HarvestWorker::new(
        settings.clone(),
        queue.clone(),
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    // 3. Both threads harvested, the expired credential rotated exactly once
    assert_eq!(summary.tasks_claimed, 1);
    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.tasks_abandoned, 0);
    assert_eq!(summary.threads_saved, 2);
    assert_eq!(summary.credentials_rotated, 1);
    assert_eq!(store.get("rust", "帖子一").unwrap(), "一楼\n二楼");
    assert_eq!(store.get("rust", "帖子二").unwrap(), "只有一楼");

    // 4. Session identities advanced monotonically, no proxies means direct egress
    let opened = provider.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].credential, "c1");
    assert_eq!(opened[1].credential, "c2");
    assert!(opened.iter().all(|id| id.egress.is_none()));

    // 5. Audit trail and checkpoint lifecycle
    assert_eq!(queue.claimed_lines(), vec![task.canonical_line()]);
    assert_eq!(queue.done_lines(), vec![task.canonical_line()]);
    assert!(!dir.path().join("resume_info.json").exists());
}

#[tokio::test]
async fn test_resume_skips_units_before_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));

    // A previous run died after finishing page 2 thread 0
    CheckpointStore::new(&settings.harvest.checkpoint_path)
        .save(&Checkpoint {
            target_index: 0,
            page: 2,
            thread_index: 1,
        })
        .unwrap();

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 2));

    // Only page 2 is scripted: resume must never touch page 1 or thread 0
    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 2),
        ScriptedPage::Html(listing_html(&[("已采过", "/p/2001"), ("待续采", "/p/2002")])),
    );
    provider.script(
        "https://forum.test/p/2002?pn=1",
        ScriptedPage::Html(thread_html(&["续采内容"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue,
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.threads_saved, 1);
    assert!(store.get("rust", "待续采").is_some());
    assert!(store.get("rust", "已采过").is_none());

    let fetched = provider.fetched();
    assert!(!fetched.contains(&listing_url(BASE, "rust", 1)));
    assert!(!fetched.iter().any(|url| url.contains("/p/2001")));
}

#[tokio::test]
async fn test_batch_resume_at_later_target_index() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));

    // The previous run died inside the third target, page 3, thread 1
    CheckpointStore::new(&settings.harvest.checkpoint_path)
        .save(&Checkpoint {
            target_index: 2,
            page: 3,
            thread_index: 1,
        })
        .unwrap();

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "c", 3),
        ScriptedPage::Html(listing_html(&[("t0", "/p/9000"), ("t1", "/p/9001")])),
    );
    provider.script(
        "https://forum.test/p/9001?pn=1",
        ScriptedPage::Html(thread_html(&["尾部内容"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    let mut worker = HarvestWorker::new(
        settings.clone(),
        Arc::new(MemoryQueue::new()),
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );

    let targets = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let outcome = worker.run_batch(&targets, 1, 3).await.unwrap();

    // Resume lands exactly on target #2, page 3, thread #1 and nothing earlier
    assert_eq!(outcome, TaskOutcome::Completed);
    assert_eq!(store.len(), 1);
    assert!(store.get("c", "t1").is_some());
    let fetched = provider.fetched();
    assert_eq!(fetched.len(), 2);
    assert!(!dir.path().join("resume_info.json").exists());
}

#[tokio::test]
async fn test_rerun_after_completion_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));
    let store = Arc::new(MemoryStore::new());
    let listing = ScriptedPage::Html(listing_html(&[("帖子一", "/p/1001"), ("帖子二", "/p/1002")]));

    // First pass harvests both threads
    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));
    let provider = Arc::new(ScriptedProvider::new());
    provider.script(&listing_url(BASE, "rust", 1), listing.clone());
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["甲"], false)),
    );
    provider.script(
        "https://forum.test/p/1002?pn=1",
        ScriptedPage::Html(thread_html(&["乙"], false)),
    );
    let worker = HarvestWorker::new(
        settings.clone(),
        queue,
        store.clone(),
        provider,
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    assert_eq!(worker.run().await.unwrap().threads_saved, 2);

    // Second pass over the same task: only the listing is scripted, so any
    // thread fetch would fail the run outright
    let queue2 = Arc::new(MemoryQueue::new());
    let task = HarvestTask::new("rust", 1, 1);
    queue2.seed(task.clone());
    let provider2 = Arc::new(ScriptedProvider::new());
    provider2.script(&listing_url(BASE, "rust", 1), listing);

    let worker2 = HarvestWorker::new(
        settings,
        queue2.clone(),
        store.clone(),
        provider2.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker2.run().await.unwrap();

    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.threads_saved, 0);
    assert_eq!(summary.threads_skipped, 2);
    assert_eq!(store.len(), 2);
    assert_eq!(queue2.done_lines(), vec![task.canonical_line()]);
    assert!(!provider2.fetched().iter().any(|url| url.contains("/p/")));
}

#[tokio::test]
async fn test_transient_faults_retry_in_place() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("抖动帖", "/p/1001")])),
    );
    provider.script("https://forum.test/p/1001?pn=1", ScriptedPage::Timeout);
    provider.script("https://forum.test/p/1001?pn=1", ScriptedPage::Timeout);
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["终于到手"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue,
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    // Retries stay on the same unit with the same session
    assert_eq!(summary.transient_retries, 2);
    assert_eq!(summary.threads_saved, 1);
    assert_eq!(summary.credentials_rotated, 0);
    assert_eq!(provider.opened().len(), 1);
    assert_eq!(store.get("rust", "抖动帖").unwrap(), "终于到手");
}

#[tokio::test]
async fn test_transient_retry_limit_abandons_task() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let mut settings = test_settings(dir.path());
    settings.harvest.transient_retries = 1;
    let settings = Arc::new(settings);

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("黑洞帖", "/p/1001")])),
    );
    // Sticky timeout: the unit never recovers
    provider.script("https://forum.test/p/1001?pn=1", ScriptedPage::Timeout);

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue.clone(),
        store,
        provider,
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.tasks_abandoned, 1);
    assert_eq!(summary.tasks_completed, 0);
    assert!(queue.done_lines().is_empty());
    assert!(!dir.path().join("resume_info.json").exists());
}

#[tokio::test]
async fn test_unclassified_fault_abandons_without_completion_record() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));

    let queue = Arc::new(MemoryQueue::new());
    let bad = HarvestTask::new("rust", 1, 1);
    let good = HarvestTask::new("go", 1, 1);
    queue.seed(bad.clone());
    queue.seed(good.clone());

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("坏帖", "/p/1001")])),
    );
    provider.script("https://forum.test/p/1001?pn=1", ScriptedPage::Fail);
    provider.script(
        &listing_url(BASE, "go", 1),
        ScriptedPage::Html(listing_html(&[("好帖", "/p/2001")])),
    );
    provider.script(
        "https://forum.test/p/2001?pn=1",
        ScriptedPage::Html(thread_html(&["内容"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue.clone(),
        store.clone(),
        provider,
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    // The poisoned task is abandoned, the worker itself survives to the next task
    assert_eq!(summary.tasks_abandoned, 1);
    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(queue.claimed_lines(), vec![bad.canonical_line(), good.canonical_line()]);
    assert_eq!(queue.done_lines(), vec![good.canonical_line()]);
    assert!(store.get("go", "好帖").is_some());
}

#[tokio::test]
async fn test_solved_challenge_resumes_same_session() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let mut settings = test_settings(dir.path());
    settings.challenge.solve_timeout_secs = 5;
    let settings = Arc::new(settings);

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("受阻帖", "/p/1001")])),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(challenge_html()),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["放行后的内容"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue,
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.challenges_solved, 1);
    assert_eq!(summary.credentials_rotated, 0);
    assert_eq!(provider.opened().len(), 1);
    assert_eq!(store.get("rust", "受阻帖").unwrap(), "放行后的内容");
}

#[tokio::test]
async fn test_unsolved_challenge_rotates_credential_and_egress() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1", "c2"]);
    std::fs::write(dir.path().join("proxies.txt"), "p1:8080\np2:8080").unwrap();
    let settings = Arc::new(test_settings(dir.path()));

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("受阻帖", "/p/1001")])),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(challenge_html()),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["换了身份才拿到"], false)),
    );

    let store = Arc::new(MemoryStore::new());
    // A zero-length intervention window with an operator who never answers
    let worker = HarvestWorker::new(
        settings,
        queue,
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(NeverGate),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.challenges_timed_out, 1);
    assert_eq!(summary.credentials_rotated, 1);
    assert_eq!(summary.tasks_completed, 1);

    // The discarded pair is never reused: both the credential and the egress advance
    let opened = provider.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].credential, "c1");
    assert_eq!(opened[0].egress.as_deref(), Some("p1:8080"));
    assert_eq!(opened[1].credential, "c2");
    assert_eq!(opened[1].egress.as_deref(), Some("p2:8080"));
    assert_eq!(store.get("rust", "受阻帖").unwrap(), "换了身份才拿到");
}

#[tokio::test]
async fn test_all_egress_cooling_past_bound_terminates_worker() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1", "c2"]);
    std::fs::write(dir.path().join("proxies.txt"), "p1:8080\np2:8080").unwrap();
    let mut settings = test_settings(dir.path());
    // Long cooldowns and no wait rounds: the first all-cooling check is terminal
    settings.identity.egress_block_rounds = 0;
    let settings = Arc::new(settings);

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    // Every session hits an unsolvable challenge, implicating its egress
    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("受阻帖", "/p/1001")])),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(challenge_html()),
    );

    let worker = HarvestWorker::new(
        settings,
        queue,
        Arc::new(MemoryStore::new()),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(NeverGate),
    );
    let err = worker.run().await.unwrap_err();

    // Both proxies burned one after the other, then the pool blocks for good
    assert!(matches!(err, HarvestError::EgressExhausted));
    let opened = provider.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].egress.as_deref(), Some("p1:8080"));
    assert_eq!(opened[1].egress.as_deref(), Some("p2:8080"));
}

#[tokio::test]
async fn test_unreachable_queue_is_fatal_not_drained() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let settings = Arc::new(test_settings(dir.path()));

    let worker = HarvestWorker::new(
        settings,
        Arc::new(UnreachableQueue),
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedProvider::new()),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );

    // An unreachable store must surface as an error, never as "queue drained"
    let err = worker.run().await.unwrap_err();
    assert!(matches!(err, HarvestError::Queue(_)));
}

#[tokio::test]
async fn test_credential_exhaustion_terminates_worker() {
    let dir = tempfile::tempdir().unwrap();
    // No cookies file at all: the pool is empty and the wait window is zero
    let settings = Arc::new(test_settings(dir.path()));

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let worker = HarvestWorker::new(
        settings,
        queue,
        Arc::new(MemoryStore::new()),
        Arc::new(ScriptedProvider::new()),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let err = worker.run().await.unwrap_err();
    assert!(matches!(err, HarvestError::CredentialsExhausted));
}

#[tokio::test]
async fn test_replenished_credentials_are_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    write_credentials(dir.path(), &["c1"]);
    let mut settings = test_settings(dir.path());
    // Give the operator a generous window and a fast poll
    settings.identity.credential_wait_secs = 30;
    settings.identity.credential_poll_secs = 0;
    let settings = Arc::new(settings);

    let queue = Arc::new(MemoryQueue::new());
    queue.seed(HarvestTask::new("rust", 1, 1));

    let provider = Arc::new(ScriptedProvider::new());
    provider.script(
        &listing_url(BASE, "rust", 1),
        ScriptedPage::Html(listing_html(&[("帖子", "/p/1001")])),
    );
    // c1 expires immediately; the pool is then empty until the operator appends c2
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(expired_html()),
    );
    provider.script(
        "https://forum.test/p/1001?pn=1",
        ScriptedPage::Html(thread_html(&["补充凭证采到"], false)),
    );

    let cookies_path = dir.path().join("cookies.txt");
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        std::fs::write(&cookies_path, "c1\nc2").unwrap();
    });

    let store = Arc::new(MemoryStore::new());
    let worker = HarvestWorker::new(
        settings,
        queue,
        store.clone(),
        provider.clone(),
        Arc::new(TiebaParser),
        Arc::new(SolvedGate),
    );
    let summary = worker.run().await.unwrap();

    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(provider.opened().last().unwrap().credential, "c2");
    assert_eq!(store.get("rust", "帖子").unwrap(), "补充凭证采到");
}

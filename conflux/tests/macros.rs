use conflux::{Executor, this_coro};

use std::thread;

#[conflux::test]
async fn test_body_runs_on_a_worker() {
    let name = thread::current().name().unwrap_or_default().to_owned();
    assert!(name.starts_with("conflux-worker-"), "ran on {name}");
}

#[conflux::test]
async fn test_ambient_executor_is_installed() {
    let executor: Executor = this_coro::executor().await;
    assert!(executor.handle().owns_thread());
}

#[conflux::test(worker_threads = 2)]
async fn test_worker_threads_option() -> anyhow::Result<()> {
    let child = this_coro::spawn(async { thread::current().name().map(str::to_owned) });
    let name = child.await.unwrap_or_default();

    assert!(name == "conflux-worker-0" || name == "conflux-worker-1", "ran on {name}");
    Ok(())
}

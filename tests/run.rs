use assert_call::{call, CallRecorder};
use futures::{channel::oneshot, StreamExt};
use optimistic::{Notice, NoticeKind, Optimistic, RunError};
use rt_local::{runtime::core::test, spawn_local, wait_for_idle, Task};

type Response = Result<i32, &'static str>;

type Outcome = Result<i32, RunError<&'static str>>;

fn request(o: &Optimistic<i32>, amount: i32) -> (oneshot::Sender<Response>, Task<Outcome>) {
    let (sender, receiver) = oneshot::channel::<Response>();
    let o = o.clone();
    let task = spawn_local(async move {
        o.run(move |x: &i32| x + amount, async move {
            receiver.await.unwrap_or(Err("canceled"))
        })
        .await
    });
    (sender, task)
}

#[test]
async fn run_confirmed() {
    let o = Optimistic::new(5);
    let (sender, task) = request(&o, 1);
    wait_for_idle().await;
    assert_eq!(o.view(), 6);
    assert_eq!(o.authoritative(), 5);

    sender.send(Ok(6)).unwrap();
    assert_eq!(task.await, Ok(6));
    assert_eq!(o.authoritative(), 6);
    assert_eq!(o.view(), 6);
    assert_eq!(o.pending_len(), 0);
}

#[test]
async fn run_failed() {
    let o = Optimistic::new(5);
    let (sender, task) = request(&o, 1);
    wait_for_idle().await;
    assert_eq!(o.view(), 6);

    sender.send(Err("offline")).unwrap();
    assert_eq!(task.await, Err(RunError::Failed("offline")));
    assert_eq!(o.authoritative(), 5);
    assert_eq!(o.view(), 5);
}

#[test]
async fn run_resolved_out_of_order() {
    let o = Optimistic::new(0);
    let (s0, t0) = request(&o, 1);
    let (s1, t1) = request(&o, 10);
    wait_for_idle().await;
    assert_eq!(o.view(), 11);

    s1.send(Ok(10)).unwrap();
    assert_eq!(t1.await, Ok(10));
    assert_eq!(o.view(), 11);

    s0.send(Err("conflict")).unwrap();
    assert!(t0.await.is_err());
    assert_eq!(o.view(), 10);
    assert_eq!(o.authoritative(), 10);
}

#[test]
async fn run_failure_reported_to_caller() {
    let mut cr = CallRecorder::new();
    let o = Optimistic::new(5);
    let (sender, task) = request(&o, 1);
    let report = spawn_local(async move {
        if let Err(e) = task.await {
            call!("{e}");
        }
    });
    wait_for_idle().await;

    sender.send(Err("offline")).unwrap();
    report.await;
    cr.verify("operation failed: offline");
    assert_eq!(o.view(), 5);
}

#[test]
async fn notices() {
    let o = Optimistic::new(5);
    let mut notices = o.notices();
    let (sender, task) = request(&o, 1);
    wait_for_idle().await;
    sender.send(Ok(6)).unwrap();
    task.await.unwrap();
    assert_eq!(o.revision(), 1);

    let begun = notices.next().await.unwrap();
    assert_eq!(begun.kind, NoticeKind::Begun);
    assert_eq!(
        notices.next().await,
        Some(Notice {
            token: begun.token,
            kind: NoticeKind::Confirmed,
        })
    );
}

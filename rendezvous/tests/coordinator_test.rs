// Integration tests for rendezvous::thread::group

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rendezvous::logging;
use rendezvous::thread::{
    Barrier, GroupState, JoinError, Joinability, SpawnError, ThreadGroupCoordinator, ThreadOptions,
    WorkerState,
};

#[test]
fn test_join_all_waits_for_every_worker() {
    logging::init_test();

    for count in [1, 2, 8, 64] {
        let mut coordinator = ThreadGroupCoordinator::new();
        let completed = Arc::new(AtomicUsize::new(0));

        let group = coordinator
            .spawn(
                count,
                |done: &AtomicUsize| {
                    thread::sleep(Duration::from_millis(10));
                    done.fetch_add(1, Ordering::SeqCst);
                },
                Arc::clone(&completed),
            )
            .unwrap();

        assert_eq!(coordinator.members(group).map(<[_]>::len), Some(count));
        coordinator.join_all(group).unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), count);
    }
}

#[test]
fn test_spawn_zero_threads_fails() {
    let mut coordinator = ThreadGroupCoordinator::new();
    let err = coordinator
        .spawn(0, |_: &()| {}, Arc::new(()))
        .unwrap_err();

    assert!(matches!(err, SpawnError::InvalidCount));
    assert_eq!(err.started(), 0);
    assert!(err.group().is_none());
    assert!(coordinator.live_groups().is_empty());
}

#[test]
fn test_second_join_is_rejected() {
    let mut coordinator = ThreadGroupCoordinator::new();
    let group = coordinator.spawn(2, |_: &()| {}, Arc::new(())).unwrap();

    coordinator.join_all(group).unwrap();
    assert_eq!(coordinator.state_of(group), Some(GroupState::Joined));
    assert!(coordinator.members(group).is_none());

    assert_eq!(coordinator.join_all(group), Err(JoinError::AlreadyJoined(group)));
}

#[test]
fn test_joined_groups_are_not_retained() {
    let mut coordinator = ThreadGroupCoordinator::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let mut first = None;
    for _ in 0..1000 {
        let group = coordinator
            .spawn(
                1,
                |done: &AtomicUsize| {
                    done.fetch_add(1, Ordering::SeqCst);
                },
                Arc::clone(&completed),
            )
            .unwrap();
        first.get_or_insert(group);
        assert_eq!(coordinator.group_count(), 1);

        coordinator.join_all(group).unwrap();
        assert_eq!(coordinator.group_count(), 0);
    }

    assert_eq!(completed.load(Ordering::SeqCst), 1000);
    assert!(coordinator.live_groups().is_empty());

    let first = first.unwrap();
    assert_eq!(coordinator.state_of(first), Some(GroupState::Joined));
    assert_eq!(coordinator.join_all(first), Err(JoinError::AlreadyJoined(first)));
}

#[test]
fn test_member_states_track_running_workers() {
    const WORKERS: usize = 3;

    // One extra slot for the test thread, so workers stay parked until released.
    let barrier = Arc::new(Barrier::new(WORKERS + 1).unwrap());
    let mut coordinator = ThreadGroupCoordinator::new();
    let group = coordinator
        .spawn(
            WORKERS,
            |barrier: &Barrier| {
                barrier.wait();
            },
            Arc::clone(&barrier),
        )
        .unwrap();

    let states = coordinator.member_states(group).unwrap();
    assert_eq!(states.len(), WORKERS);
    assert!(states
        .iter()
        .all(|s| matches!(s, WorkerState::Spawned | WorkerState::Running)));

    while barrier.arrived() < WORKERS {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(
        coordinator.member_states(group).unwrap(),
        vec![WorkerState::Running; WORKERS]
    );

    barrier.wait();
    coordinator.join_all(group).unwrap();
    assert!(coordinator.member_states(group).is_none());
}

#[test]
fn test_unknown_group_is_rejected() {
    let mut other = ThreadGroupCoordinator::new();
    let foreign = other.spawn(1, |_: &()| {}, Arc::new(())).unwrap();
    other.join_all(foreign).unwrap();

    let mut coordinator = ThreadGroupCoordinator::new();
    assert_eq!(coordinator.join_all(foreign), Err(JoinError::UnknownGroup(foreign)));
}

#[test]
fn test_panicking_worker_is_reported_after_all_join() {
    logging::init_test();

    let mut coordinator = ThreadGroupCoordinator::new();
    let completed = Arc::new(AtomicUsize::new(0));
    let next_index = Arc::new(AtomicUsize::new(0));

    let group = coordinator
        .spawn(
            4,
            move |done: &AtomicUsize| {
                if next_index.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("worker failed");
                }
                thread::sleep(Duration::from_millis(10));
                done.fetch_add(1, Ordering::SeqCst);
            },
            Arc::clone(&completed),
        )
        .unwrap();

    match coordinator.join_all(group) {
        Err(JoinError::Panicked { group: failed_group, failed, first }) => {
            assert_eq!(failed_group, group);
            assert_eq!(failed, 1);
            assert_eq!(first, "worker failed");
        }
        other => panic!("expected a panicked join, got {:?}", other),
    }
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.state_of(group), Some(GroupState::Joined));
}

#[test]
fn test_repeated_spawn_join_rounds_with_shared_barrier() {
    const WORKERS: usize = 4;
    const ITERATIONS: usize = 5;
    const ROUNDS: usize = 3;

    let barrier = Arc::new(Barrier::new(WORKERS).unwrap());
    let mut coordinator = ThreadGroupCoordinator::with_options(ThreadOptions::new().with_name_prefix("round-worker-"));

    for _ in 0..ROUNDS {
        let group = coordinator
            .spawn(
                WORKERS,
                |barrier: &Barrier| {
                    for _ in 0..ITERATIONS {
                        barrier.wait();
                    }
                },
                Arc::clone(&barrier),
            )
            .unwrap();
        coordinator.join_all(group).unwrap();
        assert!(coordinator.live_groups().is_empty());
    }

    assert_eq!(barrier.generation(), (ROUNDS * ITERATIONS) as u64);
}

#[test]
fn test_independent_groups_can_be_live_together() {
    let mut coordinator = ThreadGroupCoordinator::new();
    let first_barrier = Arc::new(Barrier::new(2).unwrap());
    let second_barrier = Arc::new(Barrier::new(3).unwrap());

    let first = coordinator
        .spawn(2, |b: &Barrier| { b.wait(); }, Arc::clone(&first_barrier))
        .unwrap();
    let second = coordinator
        .spawn(3, |b: &Barrier| { b.wait(); }, Arc::clone(&second_barrier))
        .unwrap();

    let mut live = coordinator.live_groups();
    live.sort_by_key(|id| id.to_string());
    let mut expected = vec![first, second];
    expected.sort_by_key(|id| id.to_string());
    assert_eq!(live, expected);

    coordinator.join_all(second).unwrap();
    assert_eq!(coordinator.live_groups(), vec![first]);
    coordinator.join_all(first).unwrap();
    assert!(coordinator.live_groups().is_empty());
}

#[test]
fn test_threads_carry_configured_names() {
    let names: Vec<String> = (0..3).map(|i| format!("thread{}", i)).collect();
    let options = ThreadOptions::new()
        .with_names(names.clone())
        .with_stack_sizes(vec![256 * 1024; 3])
        .with_priority(0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut coordinator = ThreadGroupCoordinator::new();
    let group = coordinator
        .spawn_with_options(
            3,
            |seen: &Mutex<Vec<String>>| {
                let name = thread::current().name().unwrap_or_default().to_string();
                seen.lock().unwrap().push(name);
            },
            Arc::clone(&seen),
            &options,
        )
        .unwrap();

    let member_names: Vec<_> = coordinator
        .members(group)
        .unwrap()
        .iter()
        .map(|w| w.name().unwrap_or_default().to_string())
        .collect();
    assert_eq!(member_names, names);

    coordinator.join_all(group).unwrap();
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, names);
}

#[test]
fn test_invalid_options_are_rejected_before_spawning() {
    let mut coordinator = ThreadGroupCoordinator::new();

    let detached = ThreadOptions::new().with_joinability(Joinability::Detached);
    let err = coordinator
        .spawn_with_options(2, |_: &()| {}, Arc::new(()), &detached)
        .unwrap_err();
    assert!(matches!(err, SpawnError::InvalidOptions(_)));

    let short_names = ThreadOptions::new().with_names(vec!["only-one".to_string()]);
    let err = coordinator
        .spawn_with_options(2, |_: &()| {}, Arc::new(()), &short_names)
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid thread options: expected 2 thread names, got 1");

    assert!(coordinator.live_groups().is_empty());
}

// A stack far beyond any address space makes the platform refuse the thread.
#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
#[test]
fn test_partial_spawn_reports_started_threads() {
    logging::init_test();

    const IMPOSSIBLE_STACK: usize = 1 << 62;
    let options = ThreadOptions::new().with_stack_sizes(vec![256 * 1024, 256 * 1024, IMPOSSIBLE_STACK]);

    let completed = Arc::new(AtomicUsize::new(0));
    let mut coordinator = ThreadGroupCoordinator::new();
    let err = coordinator
        .spawn_with_options(
            3,
            |done: &AtomicUsize| {
                done.fetch_add(1, Ordering::SeqCst);
            },
            Arc::clone(&completed),
            &options,
        )
        .unwrap_err();

    assert!(matches!(err, SpawnError::Partial { requested: 3, started: 2, .. }));
    let group = err.group().expect("partial group should be joinable");
    assert_eq!(coordinator.live_groups(), vec![group]);

    coordinator.join_all(group).unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 2);
}

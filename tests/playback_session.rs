use rstest::rstest;
use tokio_test::assert_ok;

use m3u8_resolver::models::{ErrorKind, FailedItem, Playlist, ResolvedItem};
use m3u8_resolver::playback::{
    EngineCall, PlaybackEvent, PlaybackSession, PlaybackStatus, RecordingEngine, SessionCommand,
};

fn items(n: usize) -> Vec<ResolvedItem> {
    (0..n)
        .map(|i| ResolvedItem::new(format!("Channel {i}"), format!("https://cdn.example/{i}.m3u8")))
        .collect()
}

fn session_with(n: usize) -> PlaybackSession<RecordingEngine> {
    let mut session = PlaybackSession::with_seed(RecordingEngine::new(), 1);
    session.initialize(items(n));
    session
}

#[rstest]
#[case(1, 0)]
#[case(2, 1)]
#[case(5, 0)]
#[case(5, 3)]
#[case(5, 4)]
fn next_then_prev_returns_to_start(#[case] len: usize, #[case] start: usize) {
    let mut session = session_with(len);
    assert_ok!(session.select(start));

    assert_ok!(session.next());
    assert_ok!(session.prev());
    assert_eq!(session.current_index(), Some(start));

    assert_ok!(session.prev());
    assert_ok!(session.next());
    assert_eq!(session.current_index(), Some(start));
}

#[test]
fn enqueue_twice_keeps_one_entry() {
    let mut session = session_with(3);
    let item = session.items()[2].clone();

    assert!(session.enqueue(item.clone()));
    assert!(!session.enqueue(item));
    assert_eq!(session.queue_len(), 1);
}

#[test]
fn single_item_without_loop_stops_and_stays_stopped() {
    let mut session = session_with(1);
    assert_ok!(session.play());

    for _ in 0..3 {
        assert_ok!(session.handle_event(PlaybackEvent::Ended));
        assert_eq!(*session.status(), PlaybackStatus::Finished);
        assert_eq!(session.current_index(), Some(0));
    }
    assert_eq!(session.engine().loaded_urls().len(), 1);

    // An explicit action starts again
    assert_ok!(session.play());
    assert_eq!(*session.status(), PlaybackStatus::Playing);
    assert_eq!(session.engine().loaded_urls().len(), 2);
}

#[test]
fn single_item_with_loop_replays_every_time() {
    let mut session = session_with(1);
    session.set_loop(true);
    assert_ok!(session.play());

    for expected_loads in 2..5 {
        assert_ok!(session.handle_event(PlaybackEvent::Ended));
        assert_eq!(*session.status(), PlaybackStatus::Playing);
        assert_eq!(session.engine().loaded_urls().len(), expected_loads);
    }
}

#[test]
fn whole_list_plays_once_in_order() {
    let mut session = session_with(3);
    assert_ok!(session.play());
    while *session.status() != PlaybackStatus::Finished {
        assert_ok!(session.handle_event(PlaybackEvent::Ended));
    }

    assert_eq!(
        session.engine().loaded_urls(),
        vec![
            "https://cdn.example/0.m3u8",
            "https://cdn.example/1.m3u8",
            "https://cdn.example/2.m3u8",
        ]
    );
}

#[test]
fn play_after_finishing_starts_the_list_over() {
    let mut session = session_with(3);
    assert_ok!(session.play());
    while *session.status() != PlaybackStatus::Finished {
        assert_ok!(session.handle_event(PlaybackEvent::Ended));
    }

    assert_ok!(session.play());
    assert_eq!(session.current_index(), Some(0));
    assert_eq!(session.engine().last_loaded(), Some("https://cdn.example/0.m3u8"));

    assert_ok!(session.handle_event(PlaybackEvent::Ended));
    assert_eq!(*session.status(), PlaybackStatus::Playing);
    assert_eq!(session.current_index(), Some(1));
}

#[test]
fn shuffle_never_finishes_on_its_own() {
    let mut session = session_with(4);
    session.set_shuffle(true);
    assert_ok!(session.play());

    for _ in 0..40 {
        assert_ok!(session.handle_event(PlaybackEvent::Ended));
        assert_eq!(*session.status(), PlaybackStatus::Playing);
    }
}

#[test]
fn session_is_built_from_resolved_entries_only() {
    let playlist = Playlist::new(vec![
        ResolvedItem::new("A", "https://cdn.example/a.m3u8").into(),
        FailedItem::new("B", ErrorKind::AuthRequired, "Sign in to confirm your age").into(),
        ResolvedItem::new("C", "https://cdn.example/c.m3u8").into(),
    ]);

    let mut session = PlaybackSession::with_seed(RecordingEngine::new(), 3);
    session.load_playlist(&playlist);

    let titles: Vec<&str> = session.items().iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "C"]);

    let view = session.neighbors().unwrap();
    assert_eq!((view.previous.as_str(), view.current.as_str(), view.next.as_str()), ("C", "A", "C"));
}

#[test]
fn commands_drive_the_engine() {
    let mut session = session_with(3);

    let commands = [
        SessionCommand::SetVolume(60),
        SessionCommand::Select(1),
        SessionCommand::Pause,
        SessionCommand::Play,
        SessionCommand::Enqueue(0),
        SessionCommand::SetLoop(true),
    ];
    for command in commands {
        assert_ok!(session.dispatch(command));
    }

    assert_eq!(
        session.engine().calls(),
        &[
            EngineCall::SetVolume(60),
            EngineCall::SetMuted(false),
            EngineCall::Load("https://cdn.example/1.m3u8".to_string()),
            EngineCall::Play,
            EngineCall::Pause,
            EngineCall::SetMuted(false),
            EngineCall::Play,
        ]
    );
    assert_eq!(session.queue_len(), 1);
    assert!(session.loop_enabled());

    assert_ok!(session.handle_event(PlaybackEvent::Ended));
    assert_eq!(session.current_index(), Some(0));
}

#[test]
fn reinitializing_resets_modes_and_queue() {
    let mut session = session_with(3);
    session.set_loop(true);
    session.set_shuffle(true);
    session.enqueue_index(1).unwrap();
    let first_id = session.id();

    session.initialize(items(2));

    assert_ne!(session.id(), first_id);
    assert!(!session.loop_enabled());
    assert!(!session.shuffle_enabled());
    assert_eq!(session.queue_len(), 0);
    assert_eq!(session.current_index(), Some(0));
}

#[test]
fn out_of_range_commands_report_errors() {
    let mut session = session_with(2);
    assert!(session.dispatch(SessionCommand::Select(2)).is_err());
    assert!(session.dispatch(SessionCommand::Remove(9)).is_err());
    assert!(session.dispatch(SessionCommand::Enqueue(2)).is_err());
    assert_eq!(session.current_index(), Some(0));
}

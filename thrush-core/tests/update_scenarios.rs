use std::sync::Arc;
use std::time::Duration;

use thrush_config::UpdateConfig;
use thrush_contracts::testing::{FakeArchiveRegistry, FakeDecoderRegistry, FakeIdleBus, FakePersistStore, FakePlaylist};
use thrush_contracts::{IdleBus, Playlist};
use thrush_core::UpdateCore;
use thrush_model::DirectoryId;

struct Fixture {
    core: UpdateCore,
    persist: Arc<FakePersistStore>,
    playlist: Arc<FakePlaylist>,
    idle_bus: Arc<FakeIdleBus>,
}

fn fixture(root: &std::path::Path) -> Fixture {
    let config = UpdateConfig {
        music_directory: root.to_path_buf(),
        follow_inside_symlinks: true,
        follow_outside_symlinks: true,
        archive_support: true,
        pending_queue_capacity: 32,
    };
    let persist = Arc::new(FakePersistStore::default());
    let playlist = Arc::new(FakePlaylist::default());
    let idle_bus = Arc::new(FakeIdleBus::default());
    let mut core = UpdateCore::new(
        &config,
        Arc::new(FakeDecoderRegistry::default()),
        Some(Arc::new(FakeArchiveRegistry::default())),
        persist.clone(),
        playlist.clone() as Arc<dyn Playlist>,
        idle_bus.clone() as Arc<dyn IdleBus>,
    );
    core.update_global_init();
    Fixture { core, persist, playlist, idle_bus }
}

fn last_snapshot(persist: &FakePersistStore) -> Vec<thrush_model::Directory> {
    persist.saves.lock().last().cloned().expect("at least one save")
}

fn find_dir<'a>(snapshot: &'a [thrush_model::Directory], path: &str) -> &'a thrush_model::Directory {
    snapshot.iter().find(|d| d.path == path).unwrap_or_else(|| panic!("no directory at {path}"))
}

#[test]
fn s1_fresh_add_discovers_song_and_persists_once() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("a")).unwrap();
    std::fs::write(dir.path().join("a/b.flac"), b"fake-audio").unwrap();

    let mut fx = fixture(dir.path());
    let job_id = fx.core.directory_update_init(None);
    assert_eq!(job_id, 1);
    fx.core.run_until_idle();

    assert_eq!(fx.persist.save_count(), 1);
    let snapshot = last_snapshot(&fx.persist);
    let a = find_dir(&snapshot, "a");
    assert!(a.song("b.flac").is_some());
}

#[test]
fn s2_deletion_detaches_live_playlist_reference() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.flac"), b"fake-audio").unwrap();

    let mut fx = fixture(dir.path());
    fx.core.directory_update_init(None);
    fx.core.run_until_idle();

    let snapshot = last_snapshot(&fx.persist);
    let song = snapshot[0].song("b.flac").expect("song present after first scan").clone();
    fx.playlist.enqueue(song);
    assert!(fx.playlist.contains(DirectoryId::ROOT, "b.flac"));

    std::fs::remove_file(dir.path().join("b.flac")).unwrap();
    fx.core.directory_update_init(None);
    fx.core.run_until_idle();

    assert!(!fx.playlist.contains(DirectoryId::ROOT, "b.flac"));
    let snapshot = last_snapshot(&fx.persist);
    assert!(snapshot[0].song("b.flac").is_none());
}

#[test]
#[cfg(unix)]
fn s3_symlink_cycle_does_not_recurse_forever() {
    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

    let mut fx = fixture(dir.path());
    fx.core.directory_update_init(None);
    fx.core.run_until_idle();

    assert_eq!(fx.core.is_updating_db(), 0);
}

#[test]
fn s4_rename_via_mtime_refreshes_without_readding() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("x.ogg");
    std::fs::write(&file_path, b"version-one").unwrap();

    let mut fx = fixture(dir.path());
    fx.core.directory_update_init(None);
    fx.core.run_until_idle();
    let first_tags = last_snapshot(&fx.persist)[0].song("x.ogg").unwrap().tags.clone();

    // Force a distinct mtime: most filesystems have at most second-level
    // resolution for this comparison to be meaningful.
    std::thread::sleep(Duration::from_millis(1100));
    std::fs::write(&file_path, b"version-two-longer-content").unwrap();

    fx.core.directory_update_init(None);
    fx.core.run_until_idle();

    let snapshot = last_snapshot(&fx.persist);
    assert_eq!(snapshot[0].songs.len(), 1, "renamed-via-mtime file must refresh in place, not duplicate");
    let refreshed_tags = snapshot[0].song("x.ogg").unwrap().tags.clone();
    assert_ne!(first_tags, refreshed_tags);
}

#[test]
fn s5_queue_coalesces_pending_requests_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = fixture(dir.path());

    // No event is processed between these calls, so the queue stays in its
    // Running state and the two later requests coalesce onto the FIFO
    // rather than spawning concurrently.
    let first = fx.core.directory_update_init(None);
    let second = fx.core.directory_update_init(Some("p1".to_string()));
    let third = fx.core.directory_update_init(Some("p2".to_string()));
    assert_eq!((first, second, third), (1, 2, 3));

    fx.core.run_until_idle();
    assert_eq!(fx.core.is_updating_db(), 0);
}

#[test]
fn s6_name_collision_replaces_song_with_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foo"), b"not-really-audio-but-named-flac").unwrap();
    std::fs::rename(dir.path().join("foo"), dir.path().join("foo.flac")).unwrap();

    let mut fx = fixture(dir.path());
    fx.core.directory_update_init(None);
    fx.core.run_until_idle();
    assert!(last_snapshot(&fx.persist)[0].song("foo.flac").is_some());

    std::fs::remove_file(dir.path().join("foo.flac")).unwrap();
    std::fs::create_dir(dir.path().join("foo.flac")).unwrap();
    std::fs::write(dir.path().join("foo.flac/inner.flac"), b"fake-audio").unwrap();

    fx.core.directory_update_init(None);
    fx.core.run_until_idle();

    let snapshot = last_snapshot(&fx.persist);
    assert!(snapshot[0].song("foo.flac").is_none());
    let replaced = find_dir(&snapshot, "foo.flac");
    assert!(replaced.song("inner.flac").is_some());
}

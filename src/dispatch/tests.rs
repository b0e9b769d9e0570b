use super::*;
use crate::archive::ArchivePolicy;
use crate::filter::{PatternRule, RuleAction, RuleSet};
use crate::watch::WatchHandle;
use crate::watch::fake::FakeBackend;
use std::fs;
use tempfile::TempDir;

struct Fixture {
    root: TempDir,
    _logs: TempDir,
    log_path: std::path::PathBuf,
    backend: FakeBackend,
    registry: Arc<WatchRegistry>,
    cache: Arc<ChangeCache>,
    counters: Arc<Counters>,
    dispatcher: Dispatcher,
    root_handle: WatchHandle,
}

impl Fixture {
    fn new(rules: RuleSet, recursive: bool) -> Self {
        let root = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        let log_path = logs.path().join("monitor.log");
        let archive = Arc::new(
            LogArchive::open(
                &log_path,
                ArchivePolicy {
                    max_bytes: 1024 * 1024,
                    max_files: 2,
                    compress: false,
                },
            )
            .unwrap(),
        );

        let backend = FakeBackend::new();
        let registry = Arc::new(WatchRegistry::new(backend.clone()));
        let root_handle = registry.register(root.path()).unwrap().handle();
        let cache = Arc::new(ChangeCache::new(true, None));
        let counters = Arc::new(Counters::new());
        let filter = PathFilter::new(rules).reserve_with_generations(&log_path);

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            filter,
            Arc::clone(&cache),
            archive,
            Arc::clone(&counters),
            recursive,
        );

        Self {
            root,
            _logs: logs,
            log_path,
            backend,
            registry,
            cache,
            counters,
            dispatcher,
            root_handle,
        }
    }

    fn raw(&self, mask: EventMask, name: &str) -> RawEvent {
        RawEvent::new(self.root_handle, mask, Some(name))
    }

    fn log(&self) -> String {
        fs::read_to_string(&self.log_path).unwrap()
    }

    fn kinds(&self, mask: EventMask, name: &str) -> Vec<DomainEventKind> {
        self.dispatcher
            .dispatch(&self.raw(mask, name))
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }
}

fn txt_only() -> RuleSet {
    RuleSet::new(vec!["txt".into()], vec![])
}

#[test]
fn test_created_file_is_logged_and_counted() {
    let fx = Fixture::new(txt_only(), true);
    fs::write(fx.root.path().join("notes.txt"), "hello").unwrap();

    let events = fx
        .dispatcher
        .dispatch(&fx.raw(EventMask::CREATE, "notes.txt"));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, DomainEventKind::Created);
    assert_eq!(events[0].size, Some(5));

    let expected = format!("Created: {} (5 bytes)", fx.root.path().join("notes.txt").display());
    assert!(fx.log().contains(&expected));
    assert_eq!(fx.counters.events_total(), 1);
    assert_eq!(
        fx.registry.most_active(),
        Some((fx.root.path().to_path_buf(), 1))
    );
}

#[test]
fn test_rejected_name_has_no_side_effects() {
    let fx = Fixture::new(txt_only(), true);
    fs::write(fx.root.path().join("image.png"), "png").unwrap();

    assert!(fx.kinds(EventMask::MODIFY, "image.png").is_empty());
    assert!(fx.kinds(EventMask::CREATE, "scratch.tmp").is_empty());
    assert!(fx.kinds(EventMask::MODIFY, "monitor.log").is_empty());

    assert!(fx.log().is_empty());
    assert_eq!(fx.counters.events_total(), 0);
    assert!(fx.cache.is_empty());
}

#[test]
fn test_modify_gated_by_content() {
    let fx = Fixture::new(txt_only(), true);
    let path = fx.root.path().join("notes.txt");
    fs::write(&path, "v1").unwrap();

    assert_eq!(
        fx.kinds(EventMask::MODIFY, "notes.txt"),
        vec![DomainEventKind::Modified]
    );
    // Same bytes again
    fs::write(&path, "v1").unwrap();
    assert!(fx.kinds(EventMask::MODIFY, "notes.txt").is_empty());

    fs::write(&path, "v2").unwrap();
    assert_eq!(
        fx.kinds(EventMask::MODIFY, "notes.txt"),
        vec![DomainEventKind::Modified]
    );
    assert!(fx.kinds(EventMask::MODIFY, "notes.txt").is_empty());
    assert_eq!(fx.counters.events_total(), 2);
}

#[test]
fn test_one_notification_many_kinds() {
    let fx = Fixture::new(RuleSet::default(), true);
    fs::write(fx.root.path().join("a.txt"), "x").unwrap();

    assert_eq!(
        fx.kinds(EventMask::ATTRIB | EventMask::CLOSE_WRITE, "a.txt"),
        vec![DomainEventKind::AttributeChanged, DomainEventKind::Closed]
    );
    assert_eq!(fx.counters.events_total(), 2);
}

#[test]
fn test_delete_evicts_cache_entry() {
    let fx = Fixture::new(RuleSet::default(), true);
    let path = fx.root.path().join("a.txt");
    fs::write(&path, "x").unwrap();

    fx.kinds(EventMask::MODIFY, "a.txt");
    assert_eq!(fx.cache.len(), 1);

    fs::remove_file(&path).unwrap();
    assert_eq!(
        fx.kinds(EventMask::DELETE, "a.txt"),
        vec![DomainEventKind::Deleted]
    );
    assert!(fx.cache.is_empty());
}

#[test]
fn test_new_directory_installs_watches() {
    let fx = Fixture::new(txt_only(), true);
    fs::create_dir_all(fx.root.path().join("sub/inner")).unwrap();

    // Extension allow-list does not apply to directories
    assert_eq!(
        fx.kinds(EventMask::CREATE | EventMask::ISDIR, "sub"),
        vec![DomainEventKind::Created]
    );
    assert!(fx.registry.handle_of(&fx.root.path().join("sub")).is_some());
    assert!(
        fx.registry
            .handle_of(&fx.root.path().join("sub/inner"))
            .is_some()
    );
    assert_eq!(fx.backend.live_count(), 3);
}

#[test]
fn test_new_directory_ignored_when_not_recursive() {
    let fx = Fixture::new(RuleSet::default(), false);
    fs::create_dir(fx.root.path().join("sub")).unwrap();

    fx.kinds(EventMask::CREATE | EventMask::ISDIR, "sub");
    assert_eq!(fx.registry.size().count, 1);
}

#[test]
fn test_excluded_directory_is_not_watched() {
    let rules = RuleSet::new(
        vec![],
        vec![PatternRule::new(RuleAction::Exclude, "^node_modules$").unwrap()],
    );
    let fx = Fixture::new(rules, true);
    fs::create_dir_all(fx.root.path().join("node_modules/pkg/lib")).unwrap();

    assert!(fx.kinds(EventMask::CREATE | EventMask::ISDIR, "node_modules").is_empty());
    assert_eq!(fx.registry.size().count, 1);
    assert_eq!(fx.backend.live_count(), 1);

    // Moving it in is rejected the same way
    assert!(fx.kinds(EventMask::MOVED_TO | EventMask::ISDIR, "node_modules").is_empty());
    assert_eq!(fx.registry.size().count, 1);
    assert!(fx.log().is_empty());
}

#[test]
fn test_excluded_directory_still_released_on_move_out() {
    let rules = RuleSet::new(
        vec![],
        vec![PatternRule::new(RuleAction::Exclude, "^build$").unwrap()],
    );
    let fx = Fixture::new(rules, true);
    let build = fx.root.path().join("build");
    fs::create_dir(&build).unwrap();
    // Watched before the rule existed, e.g. by an earlier walk
    fx.registry.register(&build).unwrap();
    assert_eq!(fx.registry.size().count, 2);

    fx.kinds(EventMask::MOVED_FROM | EventMask::ISDIR, "build");
    assert_eq!(fx.registry.size().count, 1);
}

#[test]
fn test_directory_moved_out_drops_subtree() {
    let fx = Fixture::new(RuleSet::default(), true);
    fs::create_dir_all(fx.root.path().join("sub/inner")).unwrap();
    fx.kinds(EventMask::CREATE | EventMask::ISDIR, "sub");
    assert_eq!(fx.registry.size().count, 3);

    fx.kinds(EventMask::MOVED_FROM | EventMask::ISDIR, "sub");
    assert_eq!(fx.registry.size().count, 1);
    assert_eq!(fx.backend.live_count(), 1);
}

#[test]
fn test_deleted_directory_releases_watch() {
    let fx = Fixture::new(RuleSet::default(), true);
    let sub = fx.root.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fx.kinds(EventMask::CREATE | EventMask::ISDIR, "sub");
    assert!(fx.registry.handle_of(&sub).is_some());

    fs::remove_dir(&sub).unwrap();
    assert_eq!(
        fx.kinds(EventMask::DELETE | EventMask::ISDIR, "sub"),
        vec![DomainEventKind::Deleted]
    );
    assert!(fx.registry.handle_of(&sub).is_none());
    assert_eq!(fx.backend.live_count(), 1);
}

#[test]
fn test_overflow_is_reported() {
    let fx = Fixture::new(RuleSet::default(), true);
    let raw = RawEvent::new(WatchHandle::new(-1), EventMask::Q_OVERFLOW, None);

    assert!(fx.dispatcher.dispatch(&raw).is_empty());
    assert_eq!(fx.counters.overflow_count(), 1);
    assert!(fx.log().contains("[OVERFLOW]"));
    assert_eq!(fx.counters.events_total(), 0);
}

#[test]
fn test_ignored_forgets_watch() {
    let fx = Fixture::new(RuleSet::default(), true);
    let sub = fx.root.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let handle = fx.registry.register(&sub).unwrap().handle();

    let raw = RawEvent::new(handle, EventMask::IGNORED, None);
    assert!(fx.dispatcher.dispatch(&raw).is_empty());
    assert_eq!(fx.registry.resolve(handle), None);
    // No remove syscall for a watch the kernel already dropped
    assert_eq!(fx.backend.removed_count(), 0);
}

#[test]
fn test_unknown_handle_and_empty_name_skipped() {
    let fx = Fixture::new(RuleSet::default(), true);

    let stray = RawEvent::new(WatchHandle::new(999), EventMask::CREATE, Some("a.txt"));
    assert!(fx.dispatcher.dispatch(&stray).is_empty());

    let nameless = RawEvent::new(fx.root_handle, EventMask::ATTRIB, Some(""));
    assert!(fx.dispatcher.dispatch(&nameless).is_empty());
    assert_eq!(fx.counters.events_total(), 0);
    assert_eq!(fx.counters.unresolved(), 1);
}

#[test]
fn test_nameless_event_from_unknown_watch_is_counted() {
    let fx = Fixture::new(RuleSet::default(), true);

    let raw = RawEvent::new(WatchHandle::new(999), EventMask::ATTRIB, None);
    assert!(fx.dispatcher.dispatch(&raw).is_empty());
    assert_eq!(fx.counters.unresolved(), 1);

    // Nameless events on a live watch are not unresolved
    let own = RawEvent::new(fx.root_handle, EventMask::ATTRIB, None);
    assert!(fx.dispatcher.dispatch(&own).is_empty());
    assert_eq!(fx.counters.unresolved(), 1);
}

#[test]
fn test_alert_rule_writes_alert_line() {
    let rules = RuleSet::new(
        vec![],
        vec![PatternRule::new(RuleAction::Alert, "password").unwrap()],
    );
    let fx = Fixture::new(rules, true);
    fs::write(fx.root.path().join("password.txt"), "hunter2").unwrap();

    assert_eq!(
        fx.kinds(EventMask::CREATE, "password.txt"),
        vec![DomainEventKind::Created]
    );
    let log = fx.log();
    assert!(log.contains("[ALERT] pattern 'password' matched:"));
    assert_eq!(fx.counters.alerts(), 1);
}

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Spawns a thread that sends `()` whenever the file at `path` is modified, created or removed.
pub fn watch_config_file(path: PathBuf) -> Receiver<()> {
    let (tx, rx) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        use notify::{EventKind, RecursiveMode, Watcher};
        let mut watcher =
            match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Modify(_)
                        | EventKind::Create(_)
                        | EventKind::Remove(_)
                        | EventKind::Any => {
                            let _ = tx.send(());
                        }
                        _ => {}
                    }
                }
            }) {
                Ok(w) => w,
                Err(e) => {
                    log::warn!("config watcher unavailable: {}", e);
                    return;
                }
            };
        if let Err(e) = watcher.watch(path.as_path(), RecursiveMode::NonRecursive) {
            log::warn!("cannot watch {}: {}", path.display(), e);
            return;
        }
        log::info!("watching {}", path.display());
        loop {
            std::thread::sleep(Duration::from_secs(3600));
        }
    });
    rx
}

/// True if at least one change event is waiting. Drains the whole backlog.
pub fn take_changed(rx: &Receiver<()>) -> bool {
    let mut changed = false;
    for _ in rx.try_iter() {
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_is_collapsed_into_one_change() {
        let (tx, rx) = mpsc::channel();
        assert!(!take_changed(&rx));
        for _ in 0..5 {
            tx.send(()).unwrap();
        }
        assert!(take_changed(&rx));
        assert!(!take_changed(&rx));
    }
}

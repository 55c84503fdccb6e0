use std::any::Any;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};

use playfield_common::{StatValue, Stats};
use playfield_kernel::{App, Service, ServiceError, ServiceKey};
use tracing::{debug, info};

use crate::key::{Key, KeyEvent};

/// Sends key events to an [`InputService`], from any thread.
#[derive(Debug, Clone)]
pub struct InputHandle {
    tx: Sender<KeyEvent>,
}

impl InputHandle {
    /// Returns false once the service is gone.
    pub fn send(&self, event: KeyEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn press(&self, key: Key) -> bool {
        self.send(KeyEvent::Pressed(key))
    }

    pub fn release(&self, key: Key) -> bool {
        self.send(KeyEvent::Released(key))
    }
}

/// Keyboard state service (priority 6).
///
/// Events are queued and applied when `process` drains the queue, so key
/// state only changes between ticks. Keys released in the last drained
/// batch stay visible through [`InputService::just_released`] until the
/// next drain.
#[derive(Debug)]
pub struct InputService {
    tx: Sender<KeyEvent>,
    rx: Receiver<KeyEvent>,
    pressed: BTreeSet<Key>,
    released: Vec<Key>,
    exit_key: Option<Key>,
    events: u64,
    queries: Cell<u64>,
}

impl Default for InputService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceKey for InputService {
    const NAME: &'static str = "InputService";
}

impl InputService {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            pressed: BTreeSet::new(),
            released: Vec::new(),
            exit_key: Some(Key::Escape),
            events: 0,
            queries: Cell::new(0),
        }
    }

    /// Key whose release requests application exit; `None` disables it.
    pub fn with_exit_key(mut self, key: Option<Key>) -> Self {
        self.exit_key = key;
        self
    }

    pub fn handle(&self) -> InputHandle {
        InputHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn press(&self, key: Key) {
        let _ = self.tx.send(KeyEvent::Pressed(key));
    }

    pub fn release(&self, key: Key) {
        let _ = self.tx.send(KeyEvent::Released(key));
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.queries.set(self.queries.get() + 1);
        self.pressed.contains(&key)
    }

    pub fn just_released(&self, key: Key) -> bool {
        self.queries.set(self.queries.get() + 1);
        self.released.contains(&key)
    }

    pub fn released(&self) -> &[Key] {
        &self.released
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.pressed.iter().copied()
    }

    /// Apply every queued event. Returns true if the exit key was released.
    fn drain(&mut self) -> bool {
        self.released.clear();
        let mut exit = false;
        while let Ok(event) = self.rx.try_recv() {
            self.events += 1;
            match event {
                KeyEvent::Pressed(key) => {
                    self.pressed.insert(key);
                }
                KeyEvent::Released(key) => {
                    self.pressed.remove(&key);
                    self.released.push(key);
                    exit |= self.exit_key == Some(key);
                }
            }
            debug!(?event, "key event");
        }
        exit
    }
}

impl Service for InputService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        6
    }

    fn process(&mut self, app: &mut App) -> Result<(), ServiceError> {
        if self.drain() {
            info!("exit key released");
            app.request_exit();
        }
        Ok(())
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.input.counter.events".into(),
            StatValue::from(self.events),
        );
        stats.insert(
            "service.input.counter.pressed".into(),
            StatValue::from(self.pressed.len()),
        );
        stats.insert(
            "service.input.counter.queries".into(),
            StatValue::from(self.queries.get()),
        );
        stats
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(app: &mut App) {
        app.set_test_loop_counter(app.loop_count());
        app.process().unwrap();
    }

    #[test]
    fn key_state_changes_between_ticks() {
        let mut app = App::new("test").with(InputService::new());
        let input = app.get::<InputService>().unwrap();
        input.press(Key::Up);
        assert!(!input.is_pressed(Key::Up));

        tick(&mut app);
        assert!(app.get::<InputService>().unwrap().is_pressed(Key::Up));

        app.get::<InputService>().unwrap().release(Key::Up);
        tick(&mut app);
        let input = app.get::<InputService>().unwrap();
        assert!(!input.is_pressed(Key::Up));
        assert!(input.just_released(Key::Up));

        tick(&mut app);
        assert!(!app.get::<InputService>().unwrap().just_released(Key::Up));
    }

    #[test]
    fn handle_feeds_from_another_thread() {
        let mut app = App::new("test").with(InputService::new());
        let handle = app.get::<InputService>().unwrap().handle();
        std::thread::spawn(move || {
            handle.press(Key::Char('G'));
        })
        .join()
        .unwrap();

        tick(&mut app);
        assert!(app.get::<InputService>().unwrap().is_pressed(Key::Char('G')));
    }

    #[test]
    fn exit_key_release_requests_exit() {
        let mut app = App::new("test").with(InputService::new());
        let input = app.get::<InputService>().unwrap();
        input.press(Key::Escape);
        input.release(Key::Escape);
        app.set_test_loop_counter(10);
        app.process().unwrap();
        assert!(app.is_exit_requested());
        assert_eq!(app.loop_count(), 1);
    }

    #[test]
    fn exit_key_can_be_disabled() {
        let mut app = App::new("test").with(InputService::new().with_exit_key(None));
        app.get::<InputService>().unwrap().release(Key::Escape);
        tick(&mut app);
        assert!(!app.is_exit_requested());
    }

    #[test]
    fn stats_count_events_and_queries() {
        let mut app = App::new("test").with(InputService::new());
        let input = app.get::<InputService>().unwrap();
        input.press(Key::Left);
        input.press(Key::Right);
        input.release(Key::Left);
        tick(&mut app);
        let input = app.get::<InputService>().unwrap();
        input.is_pressed(Key::Right);
        let stats = input.stats();
        assert_eq!(stats.get("service.input.counter.events"), Some(&StatValue::Int(3)));
        assert_eq!(stats.get("service.input.counter.pressed"), Some(&StatValue::Int(1)));
        assert_eq!(stats.get("service.input.counter.queries"), Some(&StatValue::Int(1)));
    }
}

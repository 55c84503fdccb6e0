use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use playfield_common::Stats;
use tracing::{debug, error, info, info_span, trace_span};

use crate::error::{AppError, ServiceError};
use crate::service::{Service, ServiceKey};

#[derive(Debug, Default)]
struct Control {
    exit: AtomicBool,
    paused: AtomicBool,
}

/// Cloneable, thread-safe handle on the scheduler's exit latch and pause
/// gate. Hand it to anything outside the loop (window thread, signal
/// handler, test harness).
#[derive(Debug, Clone, Default)]
pub struct AppHandle {
    control: Arc<Control>,
}

impl AppHandle {
    /// One-way latch: once set the loop ends after the current iteration.
    pub fn request_exit(&self) {
        self.control.exit.store(true, Ordering::SeqCst);
    }

    pub fn is_exit_requested(&self) -> bool {
        self.control.exit.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::SeqCst)
    }
}

struct Entry {
    priority: i32,
    order: u64,
    service: Option<Box<dyn Service>>,
}

/// The service scheduler.
///
/// Owns the registry of services and runs the application lifecycle:
/// `init` once, `process` repeatedly until exit (or the loop cap), then
/// `dispose` once. Every phase visits services in ascending priority, ties
/// broken by registration order. The loop is single-threaded and
/// cooperative: a service that blocks stalls the whole tick.
pub struct App {
    name: String,
    services: BTreeMap<String, Entry>,
    next_order: u64,
    handle: AppHandle,
    max_loop_count: Option<u64>,
    loop_count: u64,
    debug_level: u8,
    initialized: Vec<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new("App")
    }
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: BTreeMap::new(),
            next_order: 0,
            handle: AppHandle::default(),
            max_loop_count: None,
            loop_count: 0,
            debug_level: 0,
            initialized: Vec::new(),
        }
    }

    /// Builder-style registration.
    pub fn with<S: Service>(mut self, service: S) -> Self {
        self.add(service);
        self
    }

    /// Register a service. A service with the same name is replaced.
    pub fn add<S: Service>(&mut self, service: S) {
        self.add_boxed(Box::new(service));
    }

    pub fn add_boxed(&mut self, service: Box<dyn Service>) {
        let name = service.name().to_string();
        let entry = Entry {
            priority: service.priority(),
            order: self.next_order,
            service: Some(service),
        };
        self.next_order += 1;
        if self.services.insert(name.clone(), entry).is_some() {
            debug!(service = %name, "service replaced");
        }
    }

    /// Run the full lifecycle. Disposal runs even when init or process fail.
    pub fn run(&mut self, args: &[String]) -> Result<(), AppError> {
        info!(app = %self.name, "application start");
        if let Err(err) = self.init(args) {
            self.dispose();
            return Err(err);
        }
        info!(app = %self.name, services = self.services.len(), "application initialized");
        let result = self.process();
        self.dispose();
        info!(app = %self.name, loops = self.loop_count, "application stop");
        result
    }

    /// Initialize every service once, in order. Stops at the first failure;
    /// services initialized before it are still disposed by [`App::dispose`].
    pub fn init(&mut self, args: &[String]) -> Result<(), AppError> {
        let _span = info_span!("init").entered();
        for name in self.ordered_names() {
            debug!(service = %name, "init");
            match self.with_service(&name, |service, app| service.init(app, args)) {
                Some(Ok(())) => self.initialized.push(name),
                Some(Err(source)) => {
                    error!(service = %name, error = %source, "service failed to initialize");
                    return Err(AppError::Init {
                        service: name,
                        source,
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    /// The main loop. While paused the loop keeps spinning (yielding the
    /// thread) without invoking services or counting iterations.
    pub fn process(&mut self) -> Result<(), AppError> {
        while !self.handle.is_exit_requested() && !self.loop_cap_reached() {
            if self.handle.is_paused() {
                std::thread::yield_now();
                continue;
            }
            let _span = trace_span!("tick", loop_count = self.loop_count).entered();
            for name in self.ordered_names() {
                if let Some(Err(source)) = self.with_service(&name, |service, app| service.process(app)) {
                    error!(service = %name, error = %source, "service failed while processing");
                    return Err(AppError::Process {
                        service: name,
                        source,
                    });
                }
            }
            self.loop_count += 1;
        }
        Ok(())
    }

    /// Dispose every initialized service once, in order.
    pub fn dispose(&mut self) {
        let _span = info_span!("dispose").entered();
        let initialized = std::mem::take(&mut self.initialized);
        for name in self.ordered_names() {
            if initialized.contains(&name) {
                debug!(service = %name, "dispose");
                self.with_service(&name, |service, app| service.dispose(app));
            }
        }
    }

    fn loop_cap_reached(&self) -> bool {
        matches!(self.max_loop_count, Some(cap) if self.loop_count > cap)
    }

    fn ordered_names(&self) -> Vec<String> {
        let mut keyed: Vec<(i32, u64, &String)> = self
            .services
            .iter()
            .map(|(name, entry)| (entry.priority, entry.order, name))
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, _, name)| name.clone()).collect()
    }

    /// Check a service out of the registry, hand it and the app to `f`, and
    /// put it back. If `f` registered a replacement under the same name, the
    /// replacement wins.
    fn with_service<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn Service, &mut App) -> R,
    ) -> Option<R> {
        let mut service = self.services.get_mut(name)?.service.take()?;
        let result = f(service.as_mut(), self);
        if let Some(entry) = self.services.get_mut(name) {
            if entry.service.is_none() {
                entry.service = Some(service);
            }
        }
        Some(result)
    }

    pub fn service<T: Service>(&self, name: &str) -> Option<&T> {
        self.services
            .get(name)?
            .service
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn service_mut<T: Service>(&mut self, name: &str) -> Option<&mut T> {
        self.services
            .get_mut(name)?
            .service
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn get<T: Service + ServiceKey>(&self) -> Option<&T> {
        self.service(T::NAME)
    }

    pub fn get_mut<T: Service + ServiceKey>(&mut self) -> Option<&mut T> {
        self.service_mut(T::NAME)
    }

    /// Typed lookup that reports a missing dependency as an error.
    pub fn require<T: Service + ServiceKey>(&self) -> Result<&T, ServiceError> {
        self.get::<T>().ok_or(ServiceError::MissingService(T::NAME))
    }

    pub fn require_mut<T: Service + ServiceKey>(&mut self) -> Result<&mut T, ServiceError> {
        self.get_mut::<T>().ok_or(ServiceError::MissingService(T::NAME))
    }

    pub fn contains_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered service names in execution order.
    pub fn service_names(&self) -> Vec<String> {
        self.ordered_names()
    }

    /// Merge the statistics of every service. Numeric values reported under
    /// the same key are summed.
    pub fn statistics(&self) -> Stats {
        let mut merged = Stats::new();
        for entry in self.services.values() {
            let Some(service) = entry.service.as_ref() else {
                continue;
            };
            for (key, value) in service.stats() {
                let combined = match merged.remove(&key) {
                    Some(existing) => existing.merge(value),
                    None => value,
                };
                merged.insert(key, combined);
            }
        }
        merged
    }

    /// Statistics whose key contains `filter`.
    pub fn filter_statistics(&self, filter: &str) -> Stats {
        self.statistics()
            .into_iter()
            .filter(|(key, _)| key.contains(filter))
            .collect()
    }

    /// A cloneable handle for requesting exit or pausing from elsewhere.
    pub fn handle(&self) -> AppHandle {
        self.handle.clone()
    }

    /// Stop the loop after the current iteration.
    pub fn request_exit(&self) {
        info!(app = %self.name, "exit has been requested");
        self.handle.request_exit();
    }

    /// Whether exit has been requested.
    pub fn is_exit_requested(&self) -> bool {
        self.handle.is_exit_requested()
    }

    /// Paused iterations skip service processing.
    pub fn set_paused(&self, paused: bool) {
        self.handle.set_paused(paused);
    }

    /// Whether the loop is paused.
    pub fn is_paused(&self) -> bool {
        self.handle.is_paused()
    }

    /// Cap the loop for deterministic runs. The loop stops once the
    /// iteration count exceeds `max_loop`, so `max_loop + 1` iterations run.
    pub fn set_test_loop_counter(&mut self, max_loop: u64) {
        self.max_loop_count = Some(max_loop);
    }

    /// Set or clear the loop cap.
    pub fn set_max_loop_count(&mut self, max_loop: Option<u64>) {
        self.max_loop_count = max_loop;
    }

    /// The loop cap, if any.
    pub fn max_loop_count(&self) -> Option<u64> {
        self.max_loop_count
    }

    /// Number of completed (unpaused) iterations.
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the application.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Current debug level, 0 when off.
    pub fn debug_level(&self) -> u8 {
        self.debug_level
    }

    /// Set the debug level.
    pub fn set_debug_level(&mut self, level: u8) {
        self.debug_level = level;
    }

    /// True when the debug level is strictly above `level`.
    pub fn is_debug_level_greater_than(&self, level: u8) -> bool {
        self.debug_level > level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playfield_common::StatValue;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        priority: i32,
        log: Log,
        fail_init: bool,
        fail_process_at: Option<usize>,
        exit_at: Option<usize>,
        processed: usize,
    }

    impl Recorder {
        fn new(name: &str, priority: i32, log: &Log) -> Self {
            Self {
                name: name.to_string(),
                priority,
                log: Rc::clone(log),
                fail_init: false,
                fail_process_at: None,
                exit_at: None,
                processed: 0,
            }
        }
    }

    impl Service for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn init(&mut self, _app: &mut App, _args: &[String]) -> Result<(), ServiceError> {
            self.log.borrow_mut().push(format!("init:{}", self.name));
            if self.fail_init {
                return Err(ServiceError::other(std::io::Error::other("boom")));
            }
            Ok(())
        }

        fn process(&mut self, app: &mut App) -> Result<(), ServiceError> {
            self.processed += 1;
            self.log.borrow_mut().push(format!("process:{}", self.name));
            if self.exit_at == Some(self.processed) {
                app.request_exit();
            }
            if self.fail_process_at == Some(self.processed) {
                return Err(ServiceError::other(std::io::Error::other("tick failed")));
            }
            Ok(())
        }

        fn dispose(&mut self, _app: &mut App) {
            self.log.borrow_mut().push(format!("dispose:{}", self.name));
        }

        fn stats(&self) -> Stats {
            let mut stats = Stats::new();
            stats.insert("calls".into(), StatValue::from(self.processed));
            stats
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn entries(log: &Log, prefix: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    #[test]
    fn services_run_in_priority_order_every_tick() {
        let log = Log::default();
        let mut app = App::new("test")
            .with(Recorder::new("five", 5, &log))
            .with(Recorder::new("zero", 0, &log))
            .with(Recorder::new("two", 2, &log));
        app.set_test_loop_counter(1);
        app.run(&[]).unwrap();

        assert_eq!(
            entries(&log, "process"),
            vec![
                "process:zero",
                "process:two",
                "process:five",
                "process:zero",
                "process:two",
                "process:five",
            ]
        );
        assert_eq!(
            entries(&log, "init"),
            vec!["init:zero", "init:two", "init:five"]
        );
        assert_eq!(
            entries(&log, "dispose"),
            vec!["dispose:zero", "dispose:two", "dispose:five"]
        );
    }

    #[test]
    fn equal_priorities_keep_registration_order() {
        let log = Log::default();
        let mut app = App::new("test")
            .with(Recorder::new("b", 1, &log))
            .with(Recorder::new("a", 1, &log));
        app.set_test_loop_counter(0);
        app.run(&[]).unwrap();
        assert_eq!(entries(&log, "process"), vec!["process:b", "process:a"]);
    }

    #[test]
    fn loop_cap_three_runs_four_iterations() {
        let log = Log::default();
        let mut app = App::new("test").with(Recorder::new("svc", 0, &log));
        app.set_test_loop_counter(3);
        app.run(&[]).unwrap();
        assert_eq!(entries(&log, "process").len(), 4);
        assert_eq!(app.loop_count(), 4);
    }

    #[test]
    fn exit_latch_finishes_current_iteration() {
        let log = Log::default();
        let mut first = Recorder::new("first", 0, &log);
        first.exit_at = Some(2);
        let mut app = App::new("test")
            .with(first)
            .with(Recorder::new("second", 1, &log));
        app.set_test_loop_counter(100);
        app.run(&[]).unwrap();

        assert_eq!(entries(&log, "process:first").len(), 2);
        assert_eq!(entries(&log, "process:second").len(), 2);
        assert!(app.is_exit_requested());
    }

    #[test]
    fn init_failure_disposes_already_initialized_services() {
        let log = Log::default();
        let mut broken = Recorder::new("broken", 1, &log);
        broken.fail_init = true;
        let mut app = App::new("test")
            .with(Recorder::new("ok", 0, &log))
            .with(broken)
            .with(Recorder::new("late", 2, &log));

        let err = app.run(&[]).unwrap_err();
        assert!(matches!(err, AppError::Init { ref service, .. } if service == "broken"));
        assert_eq!(
            *log.borrow(),
            vec!["init:ok", "init:broken", "dispose:ok"]
        );
    }

    #[test]
    fn process_failure_stops_loop_and_still_disposes() {
        let log = Log::default();
        let mut failing = Recorder::new("failing", 0, &log);
        failing.fail_process_at = Some(2);
        let mut app = App::new("test")
            .with(failing)
            .with(Recorder::new("other", 1, &log));
        app.set_test_loop_counter(10);

        let err = app.run(&[]).unwrap_err();
        assert!(matches!(err, AppError::Process { ref service, .. } if service == "failing"));
        assert_eq!(entries(&log, "process:failing").len(), 2);
        assert_eq!(entries(&log, "process:other").len(), 1);
        assert_eq!(entries(&log, "dispose").len(), 2);
    }

    #[test]
    fn dispose_runs_only_once() {
        let log = Log::default();
        let mut app = App::new("test").with(Recorder::new("svc", 0, &log));
        app.init(&[]).unwrap();
        app.dispose();
        app.dispose();
        assert_eq!(entries(&log, "dispose").len(), 1);
    }

    #[test]
    fn paused_loop_runs_nothing_until_exit() {
        let log = Log::default();
        let mut app = App::new("test").with(Recorder::new("svc", 0, &log));
        let handle = app.handle();
        handle.set_paused(true);
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            handle.request_exit();
        });
        app.run(&[]).unwrap();
        stopper.join().unwrap();

        assert!(entries(&log, "process").is_empty());
        assert_eq!(app.loop_count(), 0);
    }

    #[test]
    fn lookup_by_name_and_replace() {
        let log = Log::default();
        let mut app = App::new("test").with(Recorder::new("svc", 3, &log));
        assert_eq!(app.service::<Recorder>("svc").unwrap().priority, 3);
        assert!(app.service::<Recorder>("missing").is_none());

        app.add(Recorder::new("svc", 7, &log));
        assert_eq!(app.service_names(), vec!["svc"]);
        assert_eq!(app.service::<Recorder>("svc").unwrap().priority, 7);

        app.service_mut::<Recorder>("svc").unwrap().processed = 9;
        assert_eq!(app.service::<Recorder>("svc").unwrap().processed, 9);
    }

    #[test]
    fn statistics_are_merged_and_filtered() {
        let log = Log::default();
        let mut app = App::new("test")
            .with(Recorder::new("a", 0, &log))
            .with(Recorder::new("b", 1, &log));
        app.set_test_loop_counter(2);
        app.run(&[]).unwrap();

        let stats = app.statistics();
        assert_eq!(stats.get("calls"), Some(&StatValue::Int(6)));
        assert!(app.filter_statistics("nothing").is_empty());
        assert_eq!(app.filter_statistics("cal").len(), 1);
    }

    #[test]
    fn debug_level_comparison() {
        let mut app = App::default();
        assert!(!app.is_debug_level_greater_than(0));
        app.set_debug_level(2);
        assert!(app.is_debug_level_greater_than(1));
        assert_eq!(app.name(), "App");
    }
}

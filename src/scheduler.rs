//! Weekly generation of category summaries on a background thread.
//!
//! [`AutoReportScheduler`] owns a single worker thread.  The worker sleeps
//! until the next due time of its [`WeeklySchedule`], runs the job, and
//! repeats.  [`AutoReportScheduler::reschedule`] and
//! [`AutoReportScheduler::stop`] wake it early through a channel.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime};
use log::{info, warn};

use crate::error::ScheduleError;
use crate::paths::{Category, UploadLayout};
use crate::summary::{self, CategorySnapshot};

/// Author written into scheduled summaries.
pub const SCHEDULER_AUTHOR: &str = "AutoScheduler";
/// File holding the snapshot of a category, relative to its upload directory.
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// A weekly due time in local time.  `weekday` counts from Monday = 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: u8,
    hour: u8,
    minute: u8,
}

impl Default for WeeklySchedule {
    /// Sunday 07:00.
    fn default() -> Self {
        Self {
            weekday: 6,
            hour: 7,
            minute: 0,
        }
    }
}

impl WeeklySchedule {
    pub fn new(weekday: u8, hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if weekday > 6 {
            return Err(ScheduleError::Weekday(weekday));
        }
        if hour > 23 {
            return Err(ScheduleError::Hour(hour));
        }
        if minute > 59 {
            return Err(ScheduleError::Minute(minute));
        }
        Ok(Self {
            weekday,
            hour,
            minute,
        })
    }

    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// First due time strictly after `now`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.weekday().num_days_from_monday() as i64;
        let days_ahead = (i64::from(self.weekday) - today).rem_euclid(7);
        let time = NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or_default();
        let candidate = (now.date() + Duration::days(days_ahead)).and_time(time);
        if candidate > now {
            candidate
        } else {
            candidate + Duration::days(7)
        }
    }
}

type Job = dyn Fn() + Send + Sync + 'static;

enum Control {
    Stop,
    Reschedule(WeeklySchedule),
}

struct Worker {
    control: Sender<Control>,
    handle: JoinHandle<()>,
}

/// Runs a job once per week on a dedicated thread.
pub struct AutoReportScheduler {
    job: Arc<Job>,
    schedule: WeeklySchedule,
    last_run: Arc<Mutex<Option<NaiveDateTime>>>,
    worker: Option<Worker>,
}

impl AutoReportScheduler {
    pub fn new<F>(schedule: WeeklySchedule, job: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            job: Arc::new(job),
            schedule,
            last_run: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    pub fn schedule(&self) -> WeeklySchedule {
        self.schedule
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(false, |worker| !worker.handle.is_finished())
    }

    /// Local time the job last finished, if it ever ran.
    pub fn last_run(&self) -> Option<NaiveDateTime> {
        *self.last_run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the worker.  Calling `start` on a running scheduler does nothing.
    pub fn start(&mut self) -> Result<(), ScheduleError> {
        if self.is_running() {
            return Ok(());
        }
        self.stop();

        let (control, receiver) = mpsc::channel();
        let job = Arc::clone(&self.job);
        let last_run = Arc::clone(&self.last_run);
        let mut schedule = self.schedule;

        let handle = thread::Builder::new()
            .name("hms-auto-reports".to_string())
            .spawn(move || loop {
                let now = Local::now().naive_local();
                let next = schedule.next_run_after(now);
                let wait = (next - now).to_std().unwrap_or_default();
                info!("next automatic report run at {}", next);

                match receiver.recv_timeout(wait) {
                    Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Ok(Control::Reschedule(updated)) => schedule = updated,
                    Err(RecvTimeoutError::Timeout) => run_job(job.as_ref(), &last_run),
                }
            })
            .map_err(|err| ScheduleError::Spawn(err.to_string()))?;

        info!(
            "automatic reports scheduled for weekday {} at {:02}:{:02}",
            self.schedule.weekday, self.schedule.hour, self.schedule.minute
        );
        self.worker = Some(Worker { control, handle });
        Ok(())
    }

    /// Stops the worker and waits for it to exit.  A job already running finishes first.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // A send error means the worker is already gone.
            let _ = worker.control.send(Control::Stop);
            if worker.handle.join().is_err() {
                warn!("automatic report worker panicked");
            }
            info!("automatic reports stopped");
        }
    }

    /// Replaces the schedule; a running worker picks it up immediately.
    pub fn reschedule(&mut self, schedule: WeeklySchedule) {
        self.schedule = schedule;
        if let Some(worker) = &self.worker {
            let _ = worker.control.send(Control::Reschedule(schedule));
        }
    }

    /// Runs the job on the calling thread and records the run.
    pub fn run_now(&self) {
        run_job(self.job.as_ref(), &self.last_run);
    }
}

impl Drop for AutoReportScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_job(job: &Job, last_run: &Mutex<Option<NaiveDateTime>>) {
    job();
    *last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(Local::now().naive_local());
}

/// Outcome of one pass over the selected categories.
#[derive(Debug, Default)]
pub struct RunReport {
    pub generated: Vec<PathBuf>,
    pub failed: Vec<(Category, String)>,
}

impl RunReport {
    /// `true` when no category failed.  An empty selection is complete.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Calls `generate` for every category.  A failure is logged and recorded
/// and the remaining categories still run.
pub fn run_categories<F>(categories: &[Category], mut generate: F) -> RunReport
where
    F: FnMut(Category) -> Result<PathBuf, Box<dyn Error + Send + Sync>>,
{
    let mut report = RunReport::default();
    for &category in categories {
        match generate(category) {
            Ok(path) => report.generated.push(path),
            Err(err) => {
                warn!("automatic report for '{}' failed: {}", category, err);
                report.failed.push((category, err.to_string()));
            }
        }
    }
    info!(
        "automatic report run finished: {} generated, {} failed",
        report.generated.len(),
        report.failed.len()
    );
    report
}

/// Path of the snapshot file for `category`.
pub fn snapshot_path(layout: &UploadLayout, category: Category) -> PathBuf {
    layout.root().join(category.code()).join(SNAPSHOT_FILE_NAME)
}

/// Loads the snapshot for `category`; a missing file yields an empty snapshot.
pub fn load_snapshot(
    layout: &UploadLayout,
    category: Category,
) -> Result<CategorySnapshot, Box<dyn Error + Send + Sync>> {
    let path = snapshot_path(layout, category);
    if !path.exists() {
        return Ok(CategorySnapshot::new(category));
    }
    let text = fs::read_to_string(&path)?;
    let mut snapshot: CategorySnapshot = serde_json::from_str(&text)?;
    snapshot.category = category;
    Ok(snapshot)
}

/// Generates summaries for `categories` from their snapshot files.
pub fn generate_summaries(
    layout: &UploadLayout,
    categories: &[Category],
    logo: Option<&Path>,
) -> RunReport {
    run_categories(categories, |category| {
        let snapshot = load_snapshot(layout, category)?;
        let path = summary::generate_category_summary(
            layout,
            &snapshot,
            Local::now().naive_local(),
            SCHEDULER_AUTHOR,
            logo,
        )
        .map_err(|err| err.to_string())?;
        Ok(path)
    })
}

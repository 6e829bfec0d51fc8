use chrono::NaiveDate;

use crate::error::ForecastError;
use crate::series::HistoricalSeries;

/// Number of daily loads the lag window retains.
pub const LAG_WINDOW_DAYS: usize = 7;

/// Fixed-size circular buffer of the last seven daily loads.
///
/// Entries are actual loads while seeded from history and become predicted
/// loads as the forecaster pushes them. Entries are addressed by calendar
/// date relative to the newest one.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use load_forecast::features::LoadWindow;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let mut w = LoadWindow::from_loads(d(7), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
/// assert_eq!(w.load_on(d(1)), Some(1.0));
///
/// w.push(d(8), 8.0);
/// assert_eq!(w.load_on(d(1)), None);
/// assert_eq!(w.load_on(d(8)), Some(8.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoadWindow {
    /// Ring storage; `head` indexes the oldest entry.
    loads: [f64; LAG_WINDOW_DAYS],
    head: usize,
    /// Date of the most recently pushed load.
    newest_date: NaiveDate,
}

impl LoadWindow {
    /// Creates a window from loads ordered oldest first, the last one dated
    /// `newest_date`.
    pub fn from_loads(newest_date: NaiveDate, loads: [f64; LAG_WINDOW_DAYS]) -> Self {
        Self {
            loads,
            head: 0,
            newest_date,
        }
    }

    /// Seeds the window with the last seven actual loads of `history`.
    ///
    /// # Errors
    ///
    /// Returns [`ForecastError::InsufficientHistory`] if the series holds
    /// fewer than seven records.
    pub fn seeded(history: &HistoricalSeries) -> Result<Self, ForecastError> {
        let records = history.records();
        if records.len() < LAG_WINDOW_DAYS {
            return Err(ForecastError::InsufficientHistory {
                needed: LAG_WINDOW_DAYS,
                got: records.len(),
            });
        }

        let tail = &records[records.len() - LAG_WINDOW_DAYS..];
        let mut loads = [0.0; LAG_WINDOW_DAYS];
        for (slot, record) in loads.iter_mut().zip(tail) {
            *slot = record.load;
        }
        Ok(Self::from_loads(history.last_date(), loads))
    }

    /// Pushes the load for `date`, evicting the oldest entry.
    ///
    /// `date` must be the day after the current newest date.
    pub fn push(&mut self, date: NaiveDate, load: f64) {
        debug_assert_eq!(self.newest_date.succ_opt(), Some(date));
        self.loads[self.head] = load;
        self.head = (self.head + 1) % LAG_WINDOW_DAYS;
        self.newest_date = date;
    }

    /// Load recorded for `date`, if it is still inside the window.
    pub fn load_on(&self, date: NaiveDate) -> Option<f64> {
        let days_ago = usize::try_from((self.newest_date - date).num_days()).ok()?;
        if days_ago >= LAG_WINDOW_DAYS {
            return None;
        }
        let idx = (self.head + LAG_WINDOW_DAYS - 1 - days_ago) % LAG_WINDOW_DAYS;
        Some(self.loads[idx])
    }

    pub fn newest_date(&self) -> NaiveDate {
        self.newest_date
    }
}
